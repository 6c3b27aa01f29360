use atd_config::RiskLimits;
use atd_schemas::{AccountSnapshot, VenueDescriptor};
use atd_strategy::*;

#[test]
fn scenario_notional_strictly_increases_with_confidence() {
    let acct = AccountSnapshot::flat(10_000.0);
    let limits = RiskLimits {
        max_position_usd: Some(2_000.0),
        max_leverage: 2.0,
        max_daily_loss_pct: None,
    };
    let venue = VenueDescriptor::margin("hyperliquid", 10.0);

    let mut prev = 0.0;
    for step in 1..=20 {
        let conf = step as f64 / 20.0;
        let s = size_entry(&acct, &limits, &venue, 100.0, conf, true);
        assert!(
            s.notional_usd > prev,
            "confidence {conf}: {} !> {prev}",
            s.notional_usd
        );
        prev = s.notional_usd;
    }
    assert_eq!(prev, 2_000.0);
}

#[test]
fn scenario_scaling_off_ignores_confidence() {
    let acct = AccountSnapshot::flat(10_000.0);
    let limits = RiskLimits::default();
    let venue = VenueDescriptor::spot("kraken");

    let lo = size_entry(&acct, &limits, &venue, 100.0, 0.66, false);
    let hi = size_entry(&acct, &limits, &venue, 100.0, 0.99, false);
    assert_eq!(lo.notional_usd, hi.notional_usd);
    assert_eq!(lo.notional_usd, 100.0);
}

#[test]
fn scenario_spot_venue_ignores_configured_leverage() {
    let acct = AccountSnapshot::flat(1_000.0);
    let limits = RiskLimits {
        max_position_usd: Some(50_000.0),
        max_leverage: 5.0,
        max_daily_loss_pct: None,
    };

    let spot = size_entry(&acct, &limits, &VenueDescriptor::spot("coinbase"), 100.0, 1.0, false);
    assert_eq!(spot.effective_max_leverage, 1.0);
    assert!((spot.notional_usd - 990.0).abs() < 1e-9);

    let perp = size_entry(
        &acct,
        &limits,
        &VenueDescriptor::margin("binance-futures", 20.0),
        100.0,
        1.0,
        false,
    );
    assert_eq!(perp.effective_max_leverage, 5.0);
    assert!((perp.notional_usd - 4_950.0).abs() < 1e-9);
}
