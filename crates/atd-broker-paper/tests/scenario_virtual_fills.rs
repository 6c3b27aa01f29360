use atd_broker_paper::{VirtualAccount, VirtualBroker};
use atd_execution::{Broker, BrokerContext, BrokerError, OrderRequest};
use atd_schemas::{MarketSnapshot, OrderIntent, OrderKind, OrderStatus, OrderbookTop, Side, VenueDescriptor};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

fn ctx(bid: f64, ask: f64) -> BrokerContext {
    let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
    let mut m = MarketSnapshot::at_price("ETH-USD", (bid + ask) / 2.0, now);
    m.bid = bid;
    m.ask = ask;
    m.orderbook = Some(OrderbookTop::new(bid, ask));
    BrokerContext {
        session_id: Uuid::nil(),
        now,
        market: m,
    }
}

fn req(id: &str, side: Side, kind: OrderKind, notional: f64) -> OrderRequest {
    OrderRequest {
        client_order_id: id.to_string(),
        intent: OrderIntent {
            market: "ETH-USD".to_string(),
            side,
            notional_usd: notional,
            kind,
            reason: "scenario".to_string(),
        },
    }
}

#[tokio::test]
async fn scenario_entry_fills_at_ask_and_exit_at_bid() {
    let broker = VirtualBroker::new(VenueDescriptor::spot("coinbase"), VirtualAccount::new(1_000.0, 0.0));

    let r = broker
        .place_order(&ctx(1_990.0, 2_000.0), &req("a", Side::Buy, OrderKind::Entry, 100.0))
        .await;
    assert_eq!(r.status, OrderStatus::Filled);
    assert_eq!(r.filled_price, Some(2_000.0));
    assert_eq!(r.filled_size, Some(0.05));
    assert_eq!(r.venue_order_id.as_deref(), Some("virtual:a"));

    let st = broker.get_account_state(&ctx(1_990.0, 2_000.0)).await.unwrap();
    assert_eq!(st.positions.len(), 1);
    assert_eq!(st.cash, 900.0);
    let balances = st.spot_balances.unwrap();
    assert_eq!(balances.get("USD"), Some(&900.0));
    assert_eq!(balances.get("ETH"), Some(&0.05));

    let tick = ctx(2_195.0, 2_205.0);
    broker.on_tick(&tick).await.unwrap();
    let st = broker.get_account_state(&tick).await.unwrap();
    assert!((st.equity - 1_010.0).abs() < 1e-9);
    assert!((st.positions[0].unrealized_pnl - 10.0).abs() < 1e-9);

    let r = broker
        .place_order(&tick, &req("b", Side::Sell, OrderKind::Exit, 100.0))
        .await;
    assert_eq!(r.filled_price, Some(2_195.0));
    let st = broker.get_account_state(&tick).await.unwrap();
    assert!(st.positions.is_empty());
    assert!((st.cash - 1_009.75).abs() < 1e-9);
}

#[tokio::test]
async fn scenario_duplicate_client_order_id_is_not_refilled() {
    let broker = VirtualBroker::new(
        VenueDescriptor::margin("simulated", 10.0),
        VirtualAccount::new(1_000.0, 0.0),
    );
    let c = ctx(99.0, 101.0);
    let first = broker.place_order(&c, &req("dup", Side::Sell, OrderKind::Entry, 50.0)).await;
    let second = broker.place_order(&c, &req("dup", Side::Sell, OrderKind::Entry, 50.0)).await;

    assert_eq!(first, second);
    let st = broker.get_account_state(&c).await.unwrap();
    assert_eq!(st.positions.len(), 1);
    assert!((st.cash - 1_050.0).abs() < 1e-9);
}

#[tokio::test]
async fn scenario_spot_venue_refuses_short_even_if_asked() {
    let broker = VirtualBroker::new(VenueDescriptor::spot("coinbase"), VirtualAccount::new(1_000.0, 0.0));
    let r = broker
        .place_order(&ctx(99.0, 101.0), &req("s", Side::Sell, OrderKind::Entry, 50.0))
        .await;
    assert_eq!(r.status, OrderStatus::Failed);
    assert!(r.error.unwrap_or_default().contains("short"));
}

#[tokio::test]
async fn scenario_exit_without_position_fails() {
    let broker = VirtualBroker::new(VenueDescriptor::spot("kraken"), VirtualAccount::new(1_000.0, 0.0));
    let r = broker
        .place_order(&ctx(99.0, 101.0), &req("x", Side::Sell, OrderKind::Exit, 50.0))
        .await;
    assert_eq!(r.status, OrderStatus::Failed);
}

#[tokio::test]
async fn scenario_missing_account_is_an_error() {
    let broker = VirtualBroker::without_account(VenueDescriptor::spot("kraken"));
    let err = broker.get_account_state(&ctx(99.0, 101.0)).await.unwrap_err();
    assert!(matches!(err, BrokerError::AccountNotFound(_)));
}

#[tokio::test]
async fn scenario_account_round_trips_through_json() {
    let broker = VirtualBroker::new(VenueDescriptor::spot("coinbase"), VirtualAccount::new(500.0, 5.0));
    broker
        .place_order(&ctx(99.0, 100.0), &req("j", Side::Buy, OrderKind::Entry, 100.0))
        .await;

    let acct = broker.account().await.unwrap();
    let json = serde_json::to_string(&acct).unwrap();
    let back: VirtualAccount = serde_json::from_str(&json).unwrap();
    assert_eq!(back, acct);
}

#[tokio::test]
async fn scenario_dedupe_memory_is_bounded_for_long_lived_broker() {
    let broker = VirtualBroker::with_dedupe_capacity(
        VenueDescriptor::margin("simulated", 10.0),
        VirtualAccount::new(1_000.0, 0.0),
        2,
    );
    let c = ctx(99.0, 101.0);

    for (id, side, kind) in [
        ("e1", Side::Buy, OrderKind::Entry),
        ("x1", Side::Sell, OrderKind::Exit),
        ("e2", Side::Buy, OrderKind::Entry),
        ("x2", Side::Sell, OrderKind::Exit),
        ("e3", Side::Buy, OrderKind::Entry),
    ] {
        let r = broker.place_order(&c, &req(id, side, kind, 50.0)).await;
        assert_eq!(r.status, OrderStatus::Filled, "{id}");
        assert!(broker.remembered_orders().await <= 2);
    }
    assert_eq!(broker.remembered_orders().await, 2);

    // The most recent id is still de-duplicated.
    let again = broker.place_order(&c, &req("e3", Side::Buy, OrderKind::Entry, 50.0)).await;
    assert_eq!(again.venue_order_id.as_deref(), Some("virtual:e3"));
    let st = broker.get_account_state(&c).await.unwrap();
    assert_eq!(st.positions.len(), 1);
}
