//! Scenario: Retried tick does not place a second order
//!
//! # Invariants under test
//!
//! 1. A completed tick writes one decision and one order, and marks the
//!    decision executed once the order filled.
//! 2. Re-invoking the same tick (same cadence slot) returns the same order id
//!    and makes no venue call.
//! 3. The next slot is a new tick: with a position open and no exit signal it
//!    is a `skip`, persisted with a `skipped` order row, and the trailing mark
//!    starts being tracked.

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
async fn retry_in_same_slot_replays_existing_order() -> anyhow::Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let session = running_session("BTC-USD", "hyperliquid", 60);
    let sid = session.session_id;
    store.put_session(session)?;

    let venue = known_venue("hyperliquid").expect("known venue");
    let broker = CountingBroker::new(VirtualBroker::new(venue, VirtualAccount::new(10_000.0, 0.0)));
    let orch = Orchestrator::new(
        Arc::clone(&store),
        broker,
        StaticFeed::new(50_000.0, now).with_spread(5.0),
        ScriptedIntents::new(AiIntent::new(Bias::Long, 0.8)),
        RuntimeConfig::default(),
    );

    let first = orch.run_tick(sid, now).await;
    assert!(first.success, "{first:?}");
    assert_eq!(first.action, Some(DecisionAction::Execute));
    assert_eq!(first.order_status, Some(OrderStatus::Filled));
    assert!(!first.replayed);
    assert_eq!(orch.gateway().broker().placed(), 1);

    let decisions = store.decisions();
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].executed);
    assert_eq!(Some(decisions[0].decision_id), first.decision_id);
    assert!(!store.lock_held(sid));

    for retry_at in [now, now + Duration::seconds(30)] {
        let again = orch.run_tick(sid, retry_at).await;
        assert!(again.replayed);
        assert_eq!(again.order_id, first.order_id);
        assert_eq!(again.decision_id, first.decision_id);
    }
    assert_eq!(orch.gateway().broker().placed(), 1);
    assert_eq!(store.orders().len(), 1);

    let next = orch.run_tick(sid, now + Duration::seconds(60)).await;
    assert!(next.success, "{next:?}");
    assert_eq!(next.action, Some(DecisionAction::Skip));
    assert_eq!(next.order_status, Some(OrderStatus::Skipped));
    assert_ne!(next.decision_id, first.decision_id);
    assert_eq!(orch.gateway().broker().placed(), 1);
    assert_eq!(store.orders().len(), 2);

    let mark = store.trailing_mark(sid, "BTC-USD").expect("mark tracked");
    assert!(mark.peak >= mark.trough);

    let last = store.session(sid).and_then(|s| s.last_tick_at);
    assert_eq!(last, Some(now + Duration::seconds(60)));
    Ok(())
}
