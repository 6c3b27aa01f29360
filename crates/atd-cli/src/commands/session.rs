//! `atd session ...` handlers. The kill switch is the session status: any
//! status other than `running` stops the next tick before it reads anything,
//! and a live order in flight is re-checked right before placement.

use anyhow::{Context, Result};
use atd_schemas::SessionStatus;
use tracing::info;
use uuid::Uuid;

pub async fn status(session_id: Uuid) -> Result<()> {
    let pool = atd_db::connect_from_env().await?;
    let s = atd_db::fetch_session(&pool, session_id)
        .await?
        .with_context(|| format!("session not found: {session_id}"))?;

    println!("session_id={}", s.session_id);
    println!("status={}", s.status.as_str());
    println!("market={}", s.market);
    println!("venue={}", s.venue);
    println!("cadence_seconds={}", s.cadence_seconds);
    println!(
        "last_tick_at={}",
        s.last_tick_at.map(|t| t.to_rfc3339()).unwrap_or_default()
    );
    Ok(())
}

pub async fn set_status(session_id: Uuid, status: SessionStatus) -> Result<()> {
    let pool = atd_db::connect_from_env().await?;
    atd_db::set_session_status(&pool, session_id, status).await?;
    info!(%session_id, status = status.as_str(), "session status changed");
    println!("session_id={} status={}", session_id, status.as_str());
    Ok(())
}
