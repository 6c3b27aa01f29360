//! Parity harness.
//!
//! Each scenario is routed through a `VirtualBroker` and through a
//! `LiveBroker` over [`PaperExchange`], both seeded with the same simulated
//! account. The tick input is built from whatever each broker reports, then
//! handed to the engine. The two decisions must be identical: same action,
//! bias, orders (side, notional, kind), risk verdict, and the same serialized
//! JSON.

use atd_broker_live::LiveBroker;
use atd_broker_paper::{VirtualAccount, VirtualBroker};
use atd_config::{
    ConfidenceControl, EntryRules, ExitRules, RiskLimits, StrategyConfig, TradeControl,
};
use atd_execution::{known_venue, simulated_venue, Broker, BrokerContext, BrokerError};
use atd_schemas::{
    AiIntent, Bias, MarketSnapshot, OrderKind, OrderbookTop, PositionSide, PositionSnapshot,
    Side, StrategyDecision, TradeRecord, TrailingMark, VenueDescriptor,
};
use atd_strategy::{decide, TickInput, DEFAULT_MAX_POSITION_USD};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::fakes::PaperExchange;
use crate::scenario_now;

#[derive(Debug, Clone)]
pub struct ParityScenario {
    pub name: &'static str,
    pub venue: VenueDescriptor,
    /// Seed for both brokers. May already hold a position.
    pub account: VirtualAccount,
    pub market: MarketSnapshot,
    pub intent: AiIntent,
    pub config: StrategyConfig,
    pub recent_trades: Vec<TradeRecord>,
    pub trailing: Option<TrailingMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityDiff {
    pub scenario: String,
    pub field: String,
    pub virtual_value: String,
    pub live_value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParityReport {
    pub scenarios: usize,
    pub diffs: Vec<ParityDiff>,
    /// The virtual-side decision per scenario, for inspection.
    pub decisions: Vec<(String, StrategyDecision)>,
}

impl ParityReport {
    pub fn is_clean(&self) -> bool {
        self.diffs.is_empty()
    }
}

pub async fn run_parity(scenarios: &[ParityScenario]) -> ParityReport {
    let mut report = ParityReport {
        scenarios: scenarios.len(),
        ..ParityReport::default()
    };

    for sc in scenarios {
        let now = scenario_now();

        let virtual_broker = VirtualBroker::new(sc.venue.clone(), sc.account.clone());
        let exchange = PaperExchange::new(sc.venue.clone(), sc.account.clone());
        exchange.set_market(sc.market.clone(), now);
        let live_broker = LiveBroker::new(exchange, sc.venue.clone());

        let v = decide_through(&virtual_broker, sc, now).await;
        let l = decide_through(&live_broker, sc, now).await;

        match (v, l) {
            (Ok(v), Ok(l)) => {
                report.diffs.extend(compare(sc.name, &v, &l));
                report.decisions.push((sc.name.to_string(), v));
            }
            (v, l) => report.diffs.push(ParityDiff {
                scenario: sc.name.to_string(),
                field: "error".to_string(),
                virtual_value: format!("{:?}", v.err()),
                live_value: format!("{:?}", l.err()),
            }),
        }
    }

    report
}

async fn decide_through<B: Broker>(
    broker: &B,
    sc: &ParityScenario,
    now: DateTime<Utc>,
) -> Result<StrategyDecision, BrokerError> {
    let ctx = BrokerContext {
        session_id: Uuid::nil(),
        now,
        market: sc.market.clone(),
    };
    broker.on_tick(&ctx).await?;
    let state = broker.get_account_state(&ctx).await?;

    let input = TickInput {
        now,
        market: sc.market.clone(),
        position: state.position_for(&sc.market.symbol).cloned(),
        account: state.snapshot(),
        intent: sc.intent.clone(),
        config: sc.config.clone(),
        venue: broker.venue().clone(),
        recent_trades: sc.recent_trades.clone(),
        trailing: sc.trailing.clone(),
        default_max_position_usd: DEFAULT_MAX_POSITION_USD,
    };
    Ok(decide(&input))
}

fn compare(name: &str, v: &StrategyDecision, l: &StrategyDecision) -> Vec<ParityDiff> {
    let mut out = Vec::new();
    let mut check = |field: &str, a: String, b: String| {
        if a != b {
            out.push(ParityDiff {
                scenario: name.to_string(),
                field: field.to_string(),
                virtual_value: a,
                live_value: b,
            });
        }
    };

    check("action", v.action.as_str().into(), l.action.as_str().into());
    check(
        "intent.bias",
        format!("{:?}", v.intent.bias),
        format!("{:?}", l.intent.bias),
    );
    let orders = |d: &StrategyDecision| {
        d.orders
            .iter()
            .map(|o| format!("{}:{}:{}", o.kind.as_str(), o.side, o.notional_usd))
            .collect::<Vec<_>>()
            .join(",")
    };
    check("orders", orders(v), orders(l));
    check(
        "risk_result.passed",
        format!("{:?}", v.risk_result.as_ref().map(|r| r.passed)),
        format!("{:?}", l.risk_result.as_ref().map(|r| r.passed)),
    );
    check(
        "json",
        serde_json::to_string(v).unwrap_or_default(),
        serde_json::to_string(l).unwrap_or_default(),
    );

    out
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

fn venue(name: &str) -> VenueDescriptor {
    known_venue(name).unwrap_or_else(simulated_venue)
}

fn book(symbol: &str, bid: f64, ask: f64) -> MarketSnapshot {
    let mut m = MarketSnapshot::at_price(symbol, (bid + ask) / 2.0, scenario_now());
    m.bid = bid;
    m.ask = ask;
    m.orderbook = Some(OrderbookTop::new(bid, ask));
    m
}

/// Simulated account holding one position, cash already debited/credited.
fn holding(
    equity: f64,
    market: &str,
    side: PositionSide,
    entry: f64,
    size: f64,
    opened_at: DateTime<Utc>,
) -> VirtualAccount {
    let mut a = VirtualAccount::new(equity, 0.0);
    a.cash -= side.sign() * entry * size;
    a.positions.insert(
        market.to_string(),
        PositionSnapshot {
            market: market.to_string(),
            side,
            size,
            avg_entry_price: entry,
            unrealized_pnl: 0.0,
            opened_at,
        },
    );
    a.marks.insert(market.to_string(), entry);
    a
}

fn base(name: &'static str, venue_name: &str, bias: Bias, confidence: f64) -> ParityScenario {
    ParityScenario {
        name,
        venue: venue(venue_name),
        account: VirtualAccount::new(10_000.0, 0.0),
        market: book("BTC-USD", 49_990.0, 50_010.0),
        intent: AiIntent::new(bias, confidence),
        config: StrategyConfig::default(),
        recent_trades: Vec::new(),
        trailing: None,
    }
}

/// The fixed battery every change must pass with zero diffs.
pub fn parity_battery() -> Vec<ParityScenario> {
    let now = scenario_now();
    let opened = now - Duration::hours(3);

    let mut out = vec![
        base("long_entry_default_config", "coinbase", Bias::Long, 0.8),
        base("low_confidence_rejected", "coinbase", Bias::Long, 0.3),
        base("spot_venue_refuses_short", "coinbase", Bias::Short, 0.95),
        base("neutral_bias_rejected", "hyperliquid", Bias::Neutral, 0.9),
        base("hold_bias_rejected", "kraken", Bias::Hold, 0.9),
    ];

    let mut s = base("short_entry_on_perps", "hyperliquid", Bias::Short, 0.9);
    s.config.risk = RiskLimits {
        max_position_usd: Some(500.0),
        max_leverage: 3.0,
        max_daily_loss_pct: None,
    };
    out.push(s);

    let mut s = base("confidence_scaled_entry", "binance-futures", Bias::Long, 0.7);
    s.config.entry = EntryRules {
        confidence_control: Some(ConfidenceControl {
            min_confidence: Some(0.6),
            confidence_scaling: true,
        }),
        ..EntryRules::default()
    };
    s.config.risk.max_position_usd = Some(200.0);
    out.push(s);

    let mut s = base("take_profit_exit", "hyperliquid", Bias::Long, 0.8);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Long, 49_000.0, 0.01, opened);
    s.market = MarketSnapshot::at_price("BTC-USD", 50_000.0, now);
    s.config.exit = ExitRules::TpSl {
        take_profit_pct: 2.0,
        stop_loss_pct: 1.0,
    };
    out.push(s);

    let mut s = base("max_loss_beats_close", "hyperliquid", Bias::Close, 0.9);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Long, 50_000.0, 0.01, opened);
    s.market = MarketSnapshot::at_price("BTC-USD", 44_000.0, now);
    s.config.exit = ExitRules::Signal {
        max_loss_protection_pct: Some(10.0),
        max_profit_cap_pct: None,
    };
    out.push(s);

    let mut s = base("signal_reversal_exit_short", "hyperliquid", Bias::Long, 0.8);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Short, 50_000.0, 0.01, opened);
    out.push(s);

    let mut s = base("hold_keeps_position", "hyperliquid", Bias::Hold, 0.8);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Long, 50_000.0, 0.01, opened);
    out.push(s);

    let mut s = base("trailing_stop_exit", "binance-futures", Bias::Long, 0.8);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Long, 50_000.0, 0.01, opened);
    s.market = MarketSnapshot::at_price("BTC-USD", 54_000.0, now);
    s.trailing = Some(TrailingMark {
        market: "BTC-USD".to_string(),
        position_opened_at: opened,
        peak: 60_000.0,
        trough: 50_000.0,
    });
    s.config.exit = ExitRules::Trailing {
        trailing_stop_pct: 5.0,
        initial_stop_loss_pct: 3.0,
    };
    out.push(s);

    let mut s = base("time_exit", "kraken", Bias::Long, 0.8);
    s.account = holding(10_000.0, "BTC-USD", PositionSide::Long, 50_000.0, 0.01, opened);
    s.config.exit = ExitRules::Time {
        max_hold_minutes: 120.0,
    };
    out.push(s);

    let mut s = base("daily_loss_blocks_entry", "hyperliquid", Bias::Long, 0.9);
    s.account = VirtualAccount::new(10_000.0, 0.0);
    s.account.cash = 9_000.0;
    s.config.risk.max_daily_loss_pct = Some(5.0);
    out.push(s);

    let mut s = base("hourly_cap_blocks_entry", "coinbase", Bias::Long, 0.9);
    s.config.trade_control = TradeControl {
        max_trades_per_hour: Some(2),
        ..TradeControl::default()
    };
    s.recent_trades = [50, 20]
        .iter()
        .map(|m| TradeRecord {
            market: "BTC-USD".to_string(),
            side: Side::Buy,
            kind: OrderKind::Entry,
            at: now - Duration::minutes(*m),
        })
        .collect();
    out.push(s);

    out
}
