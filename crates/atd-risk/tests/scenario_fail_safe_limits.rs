use atd_config::RiskLimits;
use atd_risk::*;
use atd_schemas::{AccountSnapshot, VenueDescriptor};

#[test]
fn scenario_unset_max_position_falls_back_to_default_cap() {
    let acct = AccountSnapshot::flat(1_000_000.0);
    let limits = RiskLimits {
        max_position_usd: None,
        max_leverage: 5.0,
        max_daily_loss_pct: None,
    };
    let venue = VenueDescriptor::margin("hyperliquid", 10.0);

    let at_cap = evaluate_order(&RiskInput {
        order_notional_usd: 100.0,
        account: &acct,
        limits: &limits,
        venue: &venue,
        default_max_position_usd: 100.0,
    });
    assert!(at_cap.passed);

    let above_cap = evaluate_order(&RiskInput {
        order_notional_usd: 100.01,
        account: &acct,
        limits: &limits,
        venue: &venue,
        default_max_position_usd: 100.0,
    });
    assert!(!above_cap.passed);
    assert_eq!(
        above_cap.violations().next().map(|c| c.name.as_str()),
        Some(check::MAX_POSITION)
    );
}

#[test]
fn scenario_spot_venue_clamps_configured_leverage_to_one() {
    let acct = AccountSnapshot::flat(1_000.0);
    let limits = RiskLimits {
        max_position_usd: Some(5_000.0),
        max_leverage: 5.0,
        max_daily_loss_pct: None,
    };

    let spot = VenueDescriptor::spot("coinbase");
    let r = evaluate_order(&RiskInput {
        order_notional_usd: 1_500.0,
        account: &acct,
        limits: &limits,
        venue: &spot,
        default_max_position_usd: 100.0,
    });
    assert!(!r.passed, "1.5x must fail on a 1x venue");

    let perps = VenueDescriptor::margin("hyperliquid", 10.0);
    let r = evaluate_order(&RiskInput {
        order_notional_usd: 1_500.0,
        account: &acct,
        limits: &limits,
        venue: &perps,
        default_max_position_usd: 100.0,
    });
    assert!(r.passed, "{}", r.violation_summary());
}

#[test]
fn scenario_non_positive_equity_fails_leverage() {
    let mut acct = AccountSnapshot::flat(0.0);
    acct.starting_equity = 1_000.0;
    let limits = RiskLimits::default();
    let venue = VenueDescriptor::spot("coinbase");

    let r = evaluate_order(&RiskInput {
        order_notional_usd: 50.0,
        account: &acct,
        limits: &limits,
        venue: &venue,
        default_max_position_usd: 100.0,
    });
    assert!(!r.passed);
    assert!(r.violations().any(|c| c.name == check::MAX_LEVERAGE));
}

#[test]
fn scenario_daily_loss_exactly_at_limit_passes() {
    let acct = AccountSnapshot {
        equity: 950.0,
        cash: 950.0,
        starting_equity: 1_000.0,
        gross_exposure: 0.0,
        net_exposure: 0.0,
    };
    let limits = RiskLimits {
        max_position_usd: Some(100.0),
        max_leverage: 1.0,
        max_daily_loss_pct: Some(5.0),
    };
    let venue = VenueDescriptor::spot("coinbase");

    let r = evaluate_order(&RiskInput {
        order_notional_usd: 50.0,
        account: &acct,
        limits: &limits,
        venue: &venue,
        default_max_position_usd: 100.0,
    });
    assert!(r.passed, "{}", r.violation_summary());
}
