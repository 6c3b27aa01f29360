//! Scenario: Absolute notional fuse
//!
//! # Invariants under test
//!
//! 1. An entry above `absolute_max_notional_usd` never reaches the broker,
//!    even though the strategy's own risk checks passed.
//! 2. The refusal is persisted as a `skipped` order and surfaced as an error.
//! 3. A retry in the same slot replays the stored row and reports the same
//!    refusal, not a success.

use std::sync::Arc;

use atd_broker_paper::{VirtualAccount, VirtualBroker};
use atd_config::RuntimeConfig;
use atd_execution::known_venue;
use atd_runtime::Orchestrator;
use atd_schemas::{AiIntent, Bias, DecisionAction, OrderStatus};
use atd_testkit::{
    running_session, scenario_now, CountingBroker, MemoryStore, ScriptedIntents, StaticFeed,
};
use chrono::Duration;

#[tokio::test]
async fn fuse_blocks_oversized_entry() -> anyhow::Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let session = running_session("ETH-USD", "binance-futures", 300);
    let sid = session.session_id;
    store.put_session(session)?;

    let runtime = RuntimeConfig {
        absolute_max_notional_usd: 50.0,
        ..RuntimeConfig::default()
    };
    let venue = known_venue("binance-futures").expect("known venue");
    let orch = Orchestrator::new(
        Arc::clone(&store),
        CountingBroker::new(VirtualBroker::new(venue, VirtualAccount::new(10_000.0, 0.0))),
        StaticFeed::new(3_000.0, now),
        ScriptedIntents::new(AiIntent::new(Bias::Long, 0.9)),
        runtime,
    );

    let out = orch.run_tick(sid, now).await;
    assert!(!out.success);
    assert_eq!(out.action, Some(DecisionAction::Execute));
    assert_eq!(out.order_status, Some(OrderStatus::Skipped));
    let err = out.error.unwrap_or_default();
    assert!(err.contains("GATE_REFUSED"), "{err}");
    assert!(err.contains("absolute cap"), "{err}");
    assert_eq!(orch.gateway().broker().placed(), 0);

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].notional_usd, 100.0);
    assert!(!store.decisions()[0].executed);

    let replay = orch.run_tick(sid, now + Duration::seconds(5)).await;
    assert!(replay.replayed);
    assert!(!replay.success);
    assert_eq!(replay.order_id, out.order_id);
    assert_eq!(replay.order_status, Some(OrderStatus::Skipped));
    assert_eq!(replay.error.as_deref(), Some(err.as_str()));
    assert_eq!(orch.gateway().broker().placed(), 0);
    assert_eq!(store.orders().len(), 1);
    Ok(())
}
