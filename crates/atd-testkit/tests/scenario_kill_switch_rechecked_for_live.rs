//! Scenario: Kill switch
//!
//! # Invariants under test
//!
//! 1. A session that is not `running` aborts the tick before anything is
//!    read from collaborators or written to the store.
//! 2. If the session is paused between Decide and Execute, a LIVE broker is
//!    never called: the order row is `skipped` with the gate refusal.
//! 3. A VIRTUAL broker is not re-checked and fills.

use std::sync::Arc;

use anyhow::Result;
use atd_broker_live::LiveBroker;
use atd_broker_paper::{VirtualAccount, VirtualBroker};
use atd_config::RuntimeConfig;
use atd_execution::known_venue;
use atd_runtime::{IntentProvider, Orchestrator, TickStore};
use atd_schemas::{
    AiIntent, Bias, MarketSnapshot, OrderStatus, SessionRecord, SessionStatus,
};
use atd_testkit::{
    running_session, scenario_now, CountingBroker, MemoryStore, PaperExchange, ScriptedIntents,
    StaticFeed,
};

/// Returns a long intent and pauses the session while doing so.
struct PausingIntents {
    store: Arc<MemoryStore>,
}

#[async_trait::async_trait]
impl IntentProvider for PausingIntents {
    async fn intent_for(
        &self,
        session: &SessionRecord,
        _market: &MarketSnapshot,
    ) -> Result<Option<AiIntent>> {
        self.store.set_status(session.session_id, SessionStatus::Paused)?;
        Ok(Some(AiIntent::new(Bias::Long, 0.9)))
    }
}

#[tokio::test]
async fn paused_session_aborts_before_side_effects() -> Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let mut session = running_session("BTC-USD", "hyperliquid", 60);
    session.status = SessionStatus::Paused;
    let sid = session.session_id;
    store.put_session(session)?;

    let venue = known_venue("hyperliquid").expect("known venue");
    let orch = Orchestrator::new(
        Arc::clone(&store),
        CountingBroker::new(VirtualBroker::new(venue, VirtualAccount::new(1_000.0, 0.0))),
        StaticFeed::new(50_000.0, now),
        ScriptedIntents::new(AiIntent::new(Bias::Long, 0.9)),
        RuntimeConfig::default(),
    );

    let out = orch.run_tick(sid, now).await;
    assert!(!out.success);
    assert!(out.error.unwrap_or_default().contains("SESSION_NOT_RUNNING"));
    assert!(store.decisions().is_empty());
    assert!(store.orders().is_empty());
    assert_eq!(orch.gateway().broker().placed(), 0);
    assert_eq!(store.session(sid).and_then(|s| s.last_tick_at), None);
    Ok(())
}

#[tokio::test]
async fn live_order_refused_when_paused_mid_tick() -> Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let session = running_session("BTC-USD", "hyperliquid", 60);
    let sid = session.session_id;
    store.put_session(session)?;

    let venue = known_venue("hyperliquid").expect("known venue");
    let exchange = PaperExchange::new(venue.clone(), VirtualAccount::new(10_000.0, 0.0));
    exchange.set_market(MarketSnapshot::at_price("BTC-USD", 50_000.0, now), now);

    let orch = Orchestrator::new(
        Arc::clone(&store),
        CountingBroker::new(LiveBroker::new(exchange, venue)),
        StaticFeed::new(50_000.0, now),
        PausingIntents {
            store: Arc::clone(&store),
        },
        RuntimeConfig::default(),
    );

    let out = orch.run_tick(sid, now).await;
    assert!(!out.success);
    assert_eq!(out.order_status, Some(OrderStatus::Skipped));
    assert!(out.error.unwrap_or_default().contains("GATE_REFUSED"));
    assert_eq!(orch.gateway().broker().placed(), 0);
    assert_eq!(orch.gateway().broker().inner().client().submit_count(), 0);

    let decisions = store.decisions();
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].decision.is_execute());
    assert!(!decisions[0].executed);
    assert_eq!(store.session_status(sid).await?, Some(SessionStatus::Paused));
    Ok(())
}

#[tokio::test]
async fn virtual_order_is_not_rechecked() -> Result<()> {
    let now = scenario_now();
    let store = Arc::new(MemoryStore::new());
    let session = running_session("BTC-USD", "hyperliquid", 60);
    let sid = session.session_id;
    store.put_session(session)?;

    let venue = known_venue("hyperliquid").expect("known venue");
    let orch = Orchestrator::new(
        Arc::clone(&store),
        CountingBroker::new(VirtualBroker::new(venue, VirtualAccount::new(10_000.0, 0.0))),
        StaticFeed::new(50_000.0, now),
        PausingIntents {
            store: Arc::clone(&store),
        },
        RuntimeConfig::default(),
    );

    let out = orch.run_tick(sid, now).await;
    assert!(out.success, "{out:?}");
    assert_eq!(out.order_status, Some(OrderStatus::Filled));
    assert_eq!(orch.gateway().broker().placed(), 1);
    Ok(())
}
