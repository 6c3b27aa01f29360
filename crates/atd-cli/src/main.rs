use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "atd")]
#[command(about = "AI trading desk tick engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> deployment...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Session kill switch and status
    Session {
        #[command(subcommand)]
        cmd: SessionCmd,
    },

    /// Run the decision engine over one tick input (JSON) and print the decision
    Decide {
        /// Path to a tick input JSON file
        #[arg(long)]
        input: String,
    },

    /// Run the parity battery (virtual vs live). Exits non-zero on any diff.
    Parity,
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses when any session is running unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with sessions actively trading.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SessionCmd {
    /// Print the session row
    Status {
        #[arg(long)]
        session_id: String,
    },

    /// Stop ticking (kill switch). Takes effect before the next placement.
    Pause {
        #[arg(long)]
        session_id: String,
    },

    /// Resume a paused session
    Resume {
        #[arg(long)]
        session_id: String,
    },

    /// Stop a session for good
    Stop {
        #[arg(long)]
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = atd_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = atd_db::status(&pool).await?;
                    println!("db_ok={} has_sessions_table={}", s.ok, s.has_sessions_table);
                }
                DbCmd::Migrate { yes } => {
                    let n = atd_db::count_running_sessions(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: detected {} running session(s). Re-run with: `atd db migrate --yes`",
                            n
                        );
                    }

                    atd_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = atd_config::load_layered_yaml(&path_refs)?;
            let runtime = loaded.runtime()?;
            println!("config_hash={}", loaded.config_hash);
            println!(
                "runtime default_max_position_usd={} absolute_max_notional_usd={} tick_lock_ttl_secs={}",
                runtime.default_max_position_usd,
                runtime.absolute_max_notional_usd,
                runtime.tick_lock_ttl_secs
            );
            println!("{}", loaded.canonical_json);
        }

        Commands::Session { cmd } => match cmd {
            SessionCmd::Status { session_id } => {
                commands::session::status(parse_session_id(&session_id)?).await?
            }
            SessionCmd::Pause { session_id } => {
                commands::session::set_status(
                    parse_session_id(&session_id)?,
                    atd_schemas::SessionStatus::Paused,
                )
                .await?
            }
            SessionCmd::Resume { session_id } => {
                commands::session::set_status(
                    parse_session_id(&session_id)?,
                    atd_schemas::SessionStatus::Running,
                )
                .await?
            }
            SessionCmd::Stop { session_id } => {
                commands::session::set_status(
                    parse_session_id(&session_id)?,
                    atd_schemas::SessionStatus::Stopped,
                )
                .await?
            }
        },

        Commands::Decide { input } => commands::engine::decide_file(&input)?,

        Commands::Parity => commands::engine::parity().await?,
    }

    Ok(())
}

fn init_tracing() {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn parse_session_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).context("invalid session_id uuid")
}
