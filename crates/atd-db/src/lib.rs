use anyhow::{anyhow, Context, Result};
use atd_schemas::{SessionRecord, SessionStatus};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

mod journal;

pub use journal::*;

pub const ENV_DB_URL: &str = "ATD_DATABASE_URL";

/// Pool from `ATD_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("{ENV_DB_URL} is not set"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("connect to postgres failed")
}

/// Apply the embedded migrations. Safe to run repeatedly.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("migrate failed")
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_sessions_table: bool,
}

/// Connectivity plus whether the schema has been applied.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let row = sqlx::query(
        r#"
        select
          1 as one,
          to_regclass('public.sessions') is not null as has_sessions
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status query failed")?;

    Ok(DbStatus {
        ok: row.try_get::<i32, _>("one")? == 1,
        has_sessions_table: row.try_get("has_sessions")?,
    })
}

/// Sessions currently `running`. The CLI refuses to migrate while any are.
pub async fn count_running_sessions(pool: &PgPool) -> Result<i64> {
    if !status(pool).await?.has_sessions_table {
        return Ok(0);
    }

    let row = sqlx::query("select count(*) as n from sessions where status = 'running'")
        .fetch_one(pool)
        .await
        .context("count_running_sessions failed")?;
    Ok(row.try_get("n")?)
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub async fn insert_session(pool: &PgPool, s: &SessionRecord) -> Result<()> {
    sqlx::query(
        r#"
        insert into sessions (
          session_id, status, market, venue, cadence_seconds, last_tick_at, strategy
        ) values (
          $1, $2, $3, $4, $5, $6, $7
        )
        "#,
    )
    .bind(s.session_id)
    .bind(s.status.as_str())
    .bind(&s.market)
    .bind(&s.venue)
    .bind(s.cadence_seconds)
    .bind(s.last_tick_at)
    .bind(&s.strategy)
    .execute(pool)
    .await
    .context("insert_session failed")?;

    Ok(())
}

pub async fn fetch_session(pool: &PgPool, session_id: Uuid) -> Result<Option<SessionRecord>> {
    let row = sqlx::query(
        r#"
        select session_id, status, market, venue, cadence_seconds, last_tick_at, strategy
        from sessions
        where session_id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .context("fetch_session failed")?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(SessionRecord {
        session_id: row.try_get("session_id")?,
        status: parse_session_status(&row.try_get::<String, _>("status")?)?,
        market: row.try_get("market")?,
        venue: row.try_get("venue")?,
        cadence_seconds: row.try_get("cadence_seconds")?,
        last_tick_at: row.try_get("last_tick_at")?,
        strategy: row.try_get("strategy")?,
    }))
}

/// Current status only. `None` when the session does not exist.
pub async fn session_status(pool: &PgPool, session_id: Uuid) -> Result<Option<SessionStatus>> {
    let row: Option<(String,)> =
        sqlx::query_as::<_, (String,)>("select status from sessions where session_id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await
            .context("session_status failed")?;

    row.map(|(s,)| parse_session_status(&s)).transpose()
}

pub async fn set_session_status(
    pool: &PgPool,
    session_id: Uuid,
    status: SessionStatus,
) -> Result<()> {
    let res = sqlx::query("update sessions set status = $2 where session_id = $1")
        .bind(session_id)
        .bind(status.as_str())
        .execute(pool)
        .await
        .context("set_session_status failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("session not found: {session_id}"));
    }
    Ok(())
}

fn parse_session_status(s: &str) -> Result<SessionStatus> {
    SessionStatus::parse(s).ok_or_else(|| anyhow!("invalid session status: {s}"))
}

// ---------------------------------------------------------------------------
// Tick lock
// ---------------------------------------------------------------------------

/// Acquire-or-skip. One conditional UPDATE, so two workers racing for the
/// same session cannot both win.
///
/// Succeeds only when no unexpired lock is held AND at least
/// `cadence_seconds` have passed since `last_tick_at` (null or the epoch
/// always qualifies). Returns `false` when the tick must be skipped.
pub async fn try_acquire_tick_lock(
    pool: &PgPool,
    session_id: Uuid,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<bool> {
    let row = sqlx::query(
        r#"
        update sessions
        set tick_lock_until = $2 + make_interval(secs => $3::double precision)
        where session_id = $1
          and (tick_lock_until is null or tick_lock_until <= $2)
          and (
            last_tick_at is null
            or last_tick_at <= to_timestamp(0)
            or $2 - last_tick_at >= make_interval(secs => cadence_seconds::double precision)
          )
        returning session_id
        "#,
    )
    .bind(session_id)
    .bind(now)
    .bind(ttl_secs)
    .fetch_optional(pool)
    .await
    .context("try_acquire_tick_lock failed")?;

    Ok(row.is_some())
}

pub async fn release_tick_lock(pool: &PgPool, session_id: Uuid) -> Result<()> {
    sqlx::query("update sessions set tick_lock_until = null where session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await
        .context("release_tick_lock failed")?;
    Ok(())
}

pub async fn touch_last_tick(pool: &PgPool, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("update sessions set last_tick_at = $2 where session_id = $1")
        .bind(session_id)
        .bind(at)
        .execute(pool)
        .await
        .context("touch_last_tick failed")?;
    Ok(())
}
