use atd_config::ExitRules;
use atd_schemas::{AiIntent, Bias, ExitType, PositionSide, PositionSnapshot};
use atd_strategy::*;
use chrono::{DateTime, Utc};

fn long(entry: f64, price: f64) -> PositionSnapshot {
    PositionSnapshot {
        market: "BTC-USD".to_string(),
        side: PositionSide::Long,
        size: 0.5,
        avg_entry_price: entry,
        unrealized_pnl: 0.0,
        opened_at: DateTime::<Utc>::UNIX_EPOCH,
    }
    .marked_at(price)
}

fn eval(
    p: &PositionSnapshot,
    price: f64,
    rules: &ExitRules,
    bias: Bias,
    peak: Option<f64>,
) -> atd_schemas::ExitEvaluation {
    let intent = AiIntent::new(bias, 0.9);
    evaluate_exit(&ExitInput {
        position: p,
        current_price: price,
        rules,
        intent: &intent,
        peak,
        trough: None,
        age_minutes: 10.0,
    })
}

#[test]
fn scenario_max_loss_protection_beats_close_bias() {
    let rules = ExitRules::Signal {
        max_loss_protection_pct: Some(5.0),
        max_profit_cap_pct: None,
    };
    let p = long(100.0, 90.0);

    let e = eval(&p, 90.0, &rules, Bias::Close, None);
    assert!(e.should_exit);
    assert_eq!(e.exit_type, Some(ExitType::MaxLossProtection));
}

#[test]
fn scenario_close_beats_reversal_and_reversal_fires_alone() {
    let rules = ExitRules::default();
    let p = long(100.0, 101.0);

    assert_eq!(
        eval(&p, 101.0, &rules, Bias::Close, None).exit_type,
        Some(ExitType::AiSignal)
    );
    assert_eq!(
        eval(&p, 101.0, &rules, Bias::Short, None).exit_type,
        Some(ExitType::SignalReversal)
    );
}

#[test]
fn scenario_take_profit_checked_before_stop_loss() {
    // Symmetric 1% band.
    let rules = ExitRules::TpSl {
        take_profit_pct: 1.0,
        stop_loss_pct: 1.0,
    };
    let p = long(100.0, 101.0);
    assert_eq!(
        eval(&p, 101.0, &rules, Bias::Hold, None).exit_type,
        Some(ExitType::TakeProfit)
    );

    let p = long(100.0, 99.0);
    assert_eq!(
        eval(&p, 99.0, &rules, Bias::Hold, None).exit_type,
        Some(ExitType::StopLoss)
    );
}

#[test]
fn scenario_trailing_stop_before_initial_stop() {
    let rules = ExitRules::Trailing {
        trailing_stop_pct: 3.0,
        initial_stop_loss_pct: 2.0,
    };

    // Ran to 120, now 116: 3.33% off peak while still in profit.
    let p = long(100.0, 116.0);
    let e = eval(&p, 116.0, &rules, Bias::Long, Some(120.0));
    assert_eq!(e.exit_type, Some(ExitType::TrailingStop));

    // Never ran up: the peak seeds at entry, 2.5% off is inside the trail
    // but below the hard floor.
    let p = long(100.0, 97.5);
    let e = eval(&p, 97.5, &rules, Bias::Long, None);
    assert_eq!(e.exit_type, Some(ExitType::InitialStopLoss));

    // Inside both.
    let p = long(100.0, 99.0);
    assert!(!eval(&p, 99.0, &rules, Bias::Long, Some(101.0)).should_exit);
}
