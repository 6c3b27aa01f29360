//! Scenario: Venue rejects the order
//!
//! # Invariants under test
//!
//! 1. A venue reject is persisted as `status=failed` with the raw venue
//!    error; the decision stays `executed=false`.
//! 2. The tick outcome carries the error instead of raising it.
//! 3. Re-invoking the same tick returns the failed order; the venue is not
//!    called a second time.

use std::sync::Arc;

use atd_broker_live::LiveBroker;
use atd_broker_paper::VirtualAccount;
use atd_config::RuntimeConfig;
use atd_execution::known_venue;
use atd_runtime::Orchestrator;
use atd_schemas::{AiIntent, Bias, MarketSnapshot, OrderStatus};
use atd_testkit::{running_session, scenario_now, MemoryStore, PaperExchange, ScriptedIntents, StaticFeed};

#[tokio::test]
async fn venue_reject_is_failed_and_not_retried() -> anyhow::Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let session = running_session("SOL-USD", "hyperliquid", 60);
    let sid = session.session_id;
    store.put_session(session)?;

    let venue = known_venue("hyperliquid").expect("known venue");
    let exchange = PaperExchange::new(venue.clone(), VirtualAccount::new(5_000.0, 0.0));
    exchange.set_market(MarketSnapshot::at_price("SOL-USD", 150.0, now), now);
    exchange.reject_orders(Some("insufficient margin"));

    let orch = Orchestrator::new(
        Arc::clone(&store),
        LiveBroker::new(exchange, venue),
        StaticFeed::new(150.0, now),
        ScriptedIntents::new(AiIntent::new(Bias::Short, 0.8)),
        RuntimeConfig::default(),
    );

    let out = orch.run_tick(sid, now).await;
    assert!(!out.success);
    assert_eq!(out.order_status, Some(OrderStatus::Failed));
    assert!(out.error.unwrap_or_default().contains("insufficient margin"));
    assert_eq!(orch.gateway().broker().client().submit_count(), 1);

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Failed);
    assert!(orders[0].venue_order_id.is_none());
    assert!(!store.decisions()[0].executed);

    let retry = orch.run_tick(sid, now).await;
    assert!(retry.replayed);
    assert_eq!(retry.order_id, out.order_id);
    assert_eq!(retry.order_status, Some(OrderStatus::Failed));
    assert_eq!(orch.gateway().broker().client().submit_count(), 1);
    Ok(())
}
