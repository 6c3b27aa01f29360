//! atd-runtime
//!
//! Single-tick orchestration:
//!
//! `LoadState -> FetchMarket -> ObtainIntent -> Decide -> PersistDecision ->
//! ExecuteOrSkip -> PersistOrder -> UpdateTimestamp`
//!
//! The orchestrator owns every suspension point of a tick (market data, the
//! AI intent, account reads, placement, persistence). The decision engine it
//! calls is pure. Persistence is reached through [`TickStore`] so the same
//! orchestrator runs over Postgres in production and in memory in tests.

mod cadence;
mod collaborators;
mod orchestrator;
mod store;

pub use cadence::{decision_id_for, is_tick_due, tick_slot};
pub use collaborators::{IntentProvider, MarkPrice, MarketFeed};
pub use orchestrator::{Orchestrator, TickOutcome};
pub use store::{PgTickStore, StoreKillSwitch, TickStore};
