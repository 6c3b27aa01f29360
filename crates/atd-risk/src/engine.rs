use atd_schemas::{RiskCheck, RiskResult};

use crate::types::check;
use crate::RiskInput;

// ---------------------------------------------------------------------------
// Sanity clamps
// ---------------------------------------------------------------------------

/// Guard: every numeric input must be finite.
///
/// NaN compares false against every limit, so a NaN notional or equity would
/// silently pass the checks below. Returns the failed check, or `None`.
pub fn validate_inputs(inp: &RiskInput<'_>) -> Option<RiskCheck> {
    let fields = [
        ("order_notional_usd", inp.order_notional_usd),
        ("equity", inp.account.equity),
        ("starting_equity", inp.account.starting_equity),
        ("gross_exposure", inp.account.gross_exposure),
        ("max_position_usd", inp.max_position_usd()),
        ("max_leverage", inp.max_leverage()),
    ];

    let bad: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, _)| *name)
        .collect();

    if bad.is_empty() {
        return None;
    }
    Some(RiskCheck {
        name: check::INPUT_SANITY.to_string(),
        passed: false,
        detail: format!("non-finite risk input(s): {}", bad.join(", ")),
    })
}

// ---------------------------------------------------------------------------
// Core evaluator
// ---------------------------------------------------------------------------

/// Evaluate a sized entry order against every risk limit.
pub fn evaluate_order(inp: &RiskInput<'_>) -> RiskResult {
    let mut checks = Vec::with_capacity(5);

    if let Some(bad) = validate_inputs(inp) {
        checks.push(bad);
    }

    checks.push(order_size(inp));
    checks.push(max_position(inp));
    checks.push(max_leverage(inp));
    checks.push(daily_loss(inp));

    RiskResult::from_checks(checks)
}

fn order_size(inp: &RiskInput<'_>) -> RiskCheck {
    let n = inp.order_notional_usd;
    let passed = n > 0.0;
    RiskCheck {
        name: check::ORDER_SIZE.to_string(),
        passed,
        detail: if passed {
            format!("order notional ${n:.2}")
        } else {
            format!("order size is zero (notional ${n:.2})")
        },
    }
}

fn max_position(inp: &RiskInput<'_>) -> RiskCheck {
    let cap = inp.max_position_usd();
    let n = inp.order_notional_usd;
    let passed = n <= cap;
    RiskCheck {
        name: check::MAX_POSITION.to_string(),
        passed,
        detail: if passed {
            format!("notional ${n:.2} within max position ${cap:.2}")
        } else {
            format!("notional ${n:.2} exceeds max position ${cap:.2}")
        },
    }
}

/// Post-trade gross leverage. Non-positive equity cannot carry any exposure.
fn max_leverage(inp: &RiskInput<'_>) -> RiskCheck {
    let limit = inp.max_leverage();
    let equity = inp.account.equity;
    let gross = inp.account.gross_exposure + inp.order_notional_usd.max(0.0);

    if equity <= 0.0 {
        return RiskCheck {
            name: check::MAX_LEVERAGE.to_string(),
            passed: false,
            detail: format!("equity ${equity:.2} cannot support exposure"),
        };
    }

    let leverage = gross / equity;
    let passed = leverage <= limit;
    RiskCheck {
        name: check::MAX_LEVERAGE.to_string(),
        passed,
        detail: if passed {
            format!("leverage {leverage:.2}x within {limit:.2}x")
        } else {
            format!("leverage {leverage:.2}x exceeds max {limit:.2}x")
        },
    }
}

/// Drawdown from the starting-equity baseline. Skipped (passes) when no limit
/// is configured or there is no meaningful baseline.
fn daily_loss(inp: &RiskInput<'_>) -> RiskCheck {
    let name = check::DAILY_LOSS.to_string();
    let Some(limit_pct) = inp.limits.max_daily_loss_pct else {
        return RiskCheck {
            name,
            passed: true,
            detail: "no daily loss limit configured".to_string(),
        };
    };

    let start = inp.account.starting_equity;
    if start <= 0.0 {
        return RiskCheck {
            name,
            passed: true,
            detail: "no starting equity baseline".to_string(),
        };
    }

    let loss_pct = (start - inp.account.equity) / start * 100.0;
    let passed = loss_pct <= limit_pct;
    RiskCheck {
        name,
        passed,
        detail: if passed {
            format!("daily loss {loss_pct:.2}% within {limit_pct:.2}%")
        } else {
            format!("daily loss {loss_pct:.2}% exceeds max {limit_pct:.2}%")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atd_config::RiskLimits;
    use atd_schemas::{AccountSnapshot, VenueDescriptor};

    #[test]
    fn nan_notional_is_flagged_not_passed() {
        let account = AccountSnapshot::flat(1_000.0);
        let limits = RiskLimits::default();
        let venue = VenueDescriptor::spot("coinbase");
        let inp = RiskInput {
            order_notional_usd: f64::NAN,
            account: &account,
            limits: &limits,
            venue: &venue,
            default_max_position_usd: 100.0,
        };

        let r = evaluate_order(&inp);
        assert!(!r.passed);
        assert_eq!(r.checks[0].name, check::INPUT_SANITY);
    }
}
