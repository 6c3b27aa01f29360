use atd_config::{EntryBehaviors, StrategyConfig};
use atd_schemas::{
    AccountSnapshot, AiIntent, Bias, DecisionAction, GateStatus, MarketSnapshot, OrderKind,
    PositionSide, PositionSnapshot, Side, TradeRecord, VenueDescriptor,
};
use atd_strategy::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
}

fn base(bias: Bias) -> TickInput {
    TickInput {
        now: now(),
        market: MarketSnapshot::at_price("ETH-USD", 3_000.0, now()),
        position: None,
        account: AccountSnapshot::flat(5_000.0),
        intent: AiIntent::new(bias, 0.9),
        config: StrategyConfig::default(),
        venue: VenueDescriptor::margin("hyperliquid", 10.0),
        recent_trades: Vec::new(),
        trailing: None,
        default_max_position_usd: DEFAULT_MAX_POSITION_USD,
    }
}

fn trade(side: Side, kind: OrderKind, minutes_ago: i64) -> TradeRecord {
    TradeRecord {
        market: "ETH-USD".to_string(),
        side,
        kind,
        at: now() - Duration::minutes(minutes_ago),
    }
}

fn failed(t: &TickInput) -> Option<EntryCheck> {
    evaluate_entry(t).failed_check
}

#[test]
fn scenario_neutral_and_guardrail_are_distinct_labels() {
    assert_eq!(failed(&base(Bias::Neutral)), Some(EntryCheck::Intent));
    assert_eq!(failed(&base(Bias::Hold)), Some(EntryCheck::Intent));
    assert_eq!(failed(&base(Bias::Close)), Some(EntryCheck::Intent));

    let mut t = base(Bias::Long);
    t.config.guardrails.allow_long = false;
    assert_eq!(failed(&t), Some(EntryCheck::Guardrail));

    let mut t = base(Bias::Short);
    t.config.guardrails.allow_short = false;
    assert_eq!(failed(&t), Some(EntryCheck::Guardrail));

    let d = decide(&t);
    assert!(d.filter_results.guardrails.is_failed());
    assert_eq!(d.filter_results.intent, GateStatus::Passed);
}

#[test]
fn scenario_open_position_blocks_entry_when_no_exit_fires() {
    let mut t = base(Bias::Long);
    t.position = Some(PositionSnapshot {
        market: "ETH-USD".to_string(),
        side: PositionSide::Long,
        size: 0.1,
        avg_entry_price: 2_990.0,
        unrealized_pnl: 1.0,
        opened_at: now() - Duration::minutes(5),
    });

    let d = decide(&t);
    assert_eq!(d.action, DecisionAction::Skip);
    assert!(d.orders.is_empty());
    assert!(d.filter_results.position.is_failed());
    assert!(d.exit.as_ref().map(|e| !e.should_exit).unwrap_or(false));
}

#[test]
fn scenario_confidence_floor_resolution_order() {
    let mut t = base(Bias::Long);
    t.intent.confidence = 0.6;
    assert_eq!(failed(&t), Some(EntryCheck::Confidence));

    t.config.guardrails.min_confidence = Some(0.5);
    assert_eq!(failed(&t), None);

    t.config.entry.confidence_control = Some(atd_config::ConfidenceControl {
        min_confidence: Some(0.7),
        confidence_scaling: false,
    });
    assert_eq!(failed(&t), Some(EntryCheck::Confidence));
}

#[test]
fn scenario_trade_frequency_counts_entries_only() {
    let mut t = base(Bias::Long);
    t.config.trade_control.max_trades_per_hour = Some(2);
    t.recent_trades = vec![
        trade(Side::Buy, OrderKind::Entry, 50),
        trade(Side::Sell, OrderKind::Exit, 40),
        trade(Side::Buy, OrderKind::Entry, 90),
    ];
    assert_eq!(failed(&t), None);

    t.recent_trades.push(trade(Side::Buy, OrderKind::Entry, 10));
    assert_eq!(failed(&t), Some(EntryCheck::TradeFrequency));

    let mut t = base(Bias::Long);
    t.config.trade_control.max_trades_per_day = Some(1);
    t.recent_trades = vec![trade(Side::Sell, OrderKind::Entry, 23 * 60)];
    assert_eq!(failed(&t), Some(EntryCheck::TradeFrequency));
    t.recent_trades = vec![trade(Side::Sell, OrderKind::Entry, 25 * 60)];
    assert_eq!(failed(&t), None);
}

#[test]
fn scenario_cooldown_applies_to_any_trade() {
    let mut t = base(Bias::Long);
    t.config.trade_control.cooldown_minutes = Some(15);
    t.recent_trades = vec![trade(Side::Sell, OrderKind::Exit, 10)];
    assert_eq!(failed(&t), Some(EntryCheck::Cooldown));

    t.recent_trades = vec![trade(Side::Sell, OrderKind::Exit, 15)];
    assert_eq!(failed(&t), None);
}

#[test]
fn scenario_same_direction_reentry_policy() {
    let mut t = base(Bias::Long);
    t.config.trade_control.allow_same_direction_reentry = false;
    t.recent_trades = vec![
        trade(Side::Sell, OrderKind::Entry, 300),
        trade(Side::Buy, OrderKind::Entry, 120),
        trade(Side::Sell, OrderKind::Exit, 60),
    ];
    assert_eq!(failed(&t), Some(EntryCheck::Reentry));

    t.intent.bias = Bias::Short;
    assert_eq!(failed(&t), None);
}

#[test]
fn scenario_behaviors_then_account() {
    let mut t = base(Bias::Long);
    t.config.entry.behaviors = EntryBehaviors {
        trend: false,
        breakout: false,
        mean_reversion: false,
    };
    t.account = AccountSnapshot::flat(0.0);
    assert_eq!(failed(&t), Some(EntryCheck::EntryBehavior));

    t.config.entry.behaviors.breakout = true;
    assert_eq!(failed(&t), Some(EntryCheck::Account));

    let d = decide(&t);
    assert_eq!(d.filter_results.first_failure(), Some("account"));
    assert_eq!(d.filter_results.behaviors, GateStatus::Passed);
}

#[test]
fn scenario_risk_failure_is_a_skip_with_result() {
    let mut t = base(Bias::Long);
    t.config.risk.max_daily_loss_pct = Some(2.0);
    t.account.equity = 4_800.0;
    t.account.cash = 4_800.0;

    let d = decide(&t);
    assert_eq!(d.action, DecisionAction::Skip);
    assert!(d.orders.is_empty());
    let risk = d.risk_result.as_ref().map(|r| r.passed);
    assert_eq!(risk, Some(false));
    assert_eq!(d.filter_results.first_failure(), Some("risk"));
    assert!(d.action_summary.contains("daily loss"));
}
