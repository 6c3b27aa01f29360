//! atd-testkit
//!
//! In-process stand-ins for every collaborator of the tick orchestrator, plus
//! the parity harness. Nothing here touches a network or a database.

mod fakes;
mod memory_store;
mod parity;

pub use fakes::{CountingBroker, PaperExchange, ScriptedIntents, StaticFeed};
pub use memory_store::MemoryStore;
pub use parity::{
    parity_battery, run_parity, ParityDiff, ParityReport, ParityScenario,
};

use atd_schemas::{SessionRecord, SessionStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A running session with no tick history.
pub fn running_session(market: &str, venue: &str, cadence_seconds: i64) -> SessionRecord {
    SessionRecord {
        session_id: Uuid::new_v4(),
        status: SessionStatus::Running,
        market: market.to_string(),
        venue: venue.to_string(),
        cadence_seconds,
        last_tick_at: None,
        strategy: serde_json::json!({}),
    }
}

/// Fixed clock for scenarios: 2025-01-06T14:00:00Z.
pub fn scenario_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_736_172_000, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
