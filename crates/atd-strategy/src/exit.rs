use atd_config::ExitRules;
use atd_schemas::{AiIntent, Bias, ExitEvaluation, ExitType, PositionSide, PositionSnapshot};

/// Inputs to the exit evaluator for one open position.
#[derive(Clone, Debug, PartialEq)]
pub struct ExitInput<'a> {
    pub position: &'a PositionSnapshot,
    pub current_price: f64,
    pub rules: &'a ExitRules,
    pub intent: &'a AiIntent,
    /// Highest price seen since the position opened.
    pub peak: Option<f64>,
    /// Lowest price seen since the position opened.
    pub trough: Option<f64>,
    /// Supplied by the caller; never computed here.
    pub age_minutes: f64,
}

/// Decide whether an open position should be closed.
///
/// Exactly one rule may fire. Rules are checked in a fixed order per mode
/// and the first match returns.
pub fn evaluate_exit(inp: &ExitInput<'_>) -> ExitEvaluation {
    let pnl_pct = inp.position.unrealized_pnl_pct();

    match inp.rules {
        ExitRules::Signal {
            max_loss_protection_pct,
            max_profit_cap_pct,
        } => signal_exit(inp, pnl_pct, *max_loss_protection_pct, *max_profit_cap_pct),
        ExitRules::TpSl {
            take_profit_pct,
            stop_loss_pct,
        } => {
            if pnl_pct >= *take_profit_pct {
                return ExitEvaluation::exit(
                    ExitType::TakeProfit,
                    format!("Take profit hit: {pnl_pct:.2}% >= {take_profit_pct:.2}%"),
                );
            }
            if pnl_pct <= -stop_loss_pct {
                return ExitEvaluation::exit(
                    ExitType::StopLoss,
                    format!("Stop loss hit: {pnl_pct:.2}% <= -{stop_loss_pct:.2}%"),
                );
            }
            ExitEvaluation::hold(format!(
                "PnL {pnl_pct:.2}% within -{stop_loss_pct:.2}%..{take_profit_pct:.2}%"
            ))
        }
        ExitRules::Trailing {
            trailing_stop_pct,
            initial_stop_loss_pct,
        } => trailing_exit(inp, pnl_pct, *trailing_stop_pct, *initial_stop_loss_pct),
        ExitRules::Time { max_hold_minutes } => {
            if inp.age_minutes >= *max_hold_minutes {
                return ExitEvaluation::exit(
                    ExitType::MaxHoldTime,
                    format!(
                        "Max hold time reached: {:.1} >= {max_hold_minutes:.1} minutes",
                        inp.age_minutes
                    ),
                );
            }
            ExitEvaluation::hold(format!(
                "Held {:.1} of {max_hold_minutes:.1} minutes",
                inp.age_minutes
            ))
        }
    }
}

fn signal_exit(
    inp: &ExitInput<'_>,
    pnl_pct: f64,
    max_loss_protection_pct: Option<f64>,
    max_profit_cap_pct: Option<f64>,
) -> ExitEvaluation {
    // Emergency overrides run before the model gets a say.
    if let Some(floor) = max_loss_protection_pct {
        if pnl_pct <= -floor {
            return ExitEvaluation::exit(
                ExitType::MaxLossProtection,
                format!("Max loss protection: {pnl_pct:.2}% <= -{floor:.2}%"),
            );
        }
    }
    if let Some(cap) = max_profit_cap_pct {
        if pnl_pct >= cap {
            return ExitEvaluation::exit(
                ExitType::MaxProfitCap,
                format!("Max profit cap: {pnl_pct:.2}% >= {cap:.2}%"),
            );
        }
    }

    let side = inp.position.side;
    match (inp.intent.bias, side) {
        (Bias::Close, _) => ExitEvaluation::exit(
            ExitType::AiSignal,
            format!(
                "Model signalled close at confidence {:.2}",
                inp.intent.confidence
            ),
        ),
        (Bias::Short, PositionSide::Long) | (Bias::Long, PositionSide::Short) => {
            ExitEvaluation::exit(
                ExitType::SignalReversal,
                format!("Bias reversed to {} against {} position", inp.intent.bias, side_name(side)),
            )
        }
        _ => ExitEvaluation::hold(format!(
            "Bias {} keeps {} position open",
            inp.intent.bias,
            side_name(side)
        )),
    }
}

fn trailing_exit(
    inp: &ExitInput<'_>,
    pnl_pct: f64,
    trailing_stop_pct: f64,
    initial_stop_loss_pct: f64,
) -> ExitEvaluation {
    let price = inp.current_price;
    let entry = inp.position.avg_entry_price;

    match inp.position.side {
        PositionSide::Long => {
            let peak = inp.peak.unwrap_or(entry).max(price);
            if peak > 0.0 {
                let drop_pct = (peak - price) / peak * 100.0;
                if drop_pct >= trailing_stop_pct {
                    return ExitEvaluation::exit(
                        ExitType::TrailingStop,
                        format!(
                            "Trailing stop: {drop_pct:.2}% below peak {peak:.2} (limit {trailing_stop_pct:.2}%)"
                        ),
                    );
                }
            }
        }
        PositionSide::Short => {
            let trough = inp.trough.unwrap_or(entry).min(price);
            if trough > 0.0 {
                let rise_pct = (price - trough) / trough * 100.0;
                if rise_pct >= trailing_stop_pct {
                    return ExitEvaluation::exit(
                        ExitType::TrailingStop,
                        format!(
                            "Trailing stop: {rise_pct:.2}% above trough {trough:.2} (limit {trailing_stop_pct:.2}%)"
                        ),
                    );
                }
            }
        }
    }

    if pnl_pct <= -initial_stop_loss_pct {
        return ExitEvaluation::exit(
            ExitType::InitialStopLoss,
            format!("Initial stop loss: {pnl_pct:.2}% <= -{initial_stop_loss_pct:.2}%"),
        );
    }

    ExitEvaluation::hold(format!("Trailing stop not reached (PnL {pnl_pct:.2}%)"))
}

fn side_name(side: PositionSide) -> &'static str {
    match side {
        PositionSide::Long => "long",
        PositionSide::Short => "short",
    }
}
