use atd_schemas::{Bias, OrderKind, PositionSide, Side};
use chrono::Duration;

use crate::{EntryCheck, EntryEvaluation, TickInput};

/// Decide whether a new position may be opened this tick.
///
/// Checks run in a fixed order and the first failure wins:
/// position, venue constraint, confidence, intent, guardrail,
/// trade frequency, cooldown, re-entry, entry behavior, account.
pub fn evaluate_entry(inp: &TickInput) -> EntryEvaluation {
    let market = inp.market.symbol.as_str();
    let cfg = &inp.config;
    let intent = &inp.intent;

    if let Some(p) = &inp.position {
        return EntryEvaluation::reject(
            EntryCheck::Position,
            format!(
                "Already in a {} position on {market}",
                match p.side {
                    PositionSide::Long => "long",
                    PositionSide::Short => "short",
                }
            ),
        );
    }

    if intent.bias == Bias::Short && !inp.venue.allows_short {
        return EntryEvaluation::reject(
            EntryCheck::VenueConstraint,
            format!(
                "Venue {} does not support short selling (spot only)",
                inp.venue.name
            ),
        );
    }

    let floor = cfg.effective_min_confidence();
    if !(intent.confidence >= floor) {
        return EntryEvaluation::reject(
            EntryCheck::Confidence,
            format!(
                "Confidence {:.2} below minimum {floor:.2}",
                intent.confidence
            ),
        );
    }

    let side = match intent.bias {
        Bias::Long => Side::Buy,
        Bias::Short => Side::Sell,
        Bias::Neutral | Bias::Hold | Bias::Close => {
            return EntryEvaluation::reject(
                EntryCheck::Intent,
                format!("Model bias is {}; no entry requested", intent.bias),
            );
        }
    };

    if side == Side::Buy && !cfg.guardrails.allow_long {
        return EntryEvaluation::reject(
            EntryCheck::Guardrail,
            "Long entries are disabled by guardrails",
        );
    }
    if side == Side::Sell && !cfg.guardrails.allow_short {
        return EntryEvaluation::reject(
            EntryCheck::Guardrail,
            "Short entries are disabled by guardrails",
        );
    }

    let tc = &cfg.trade_control;
    let entries = || {
        inp.recent_trades
            .iter()
            .filter(move |t| t.kind == OrderKind::Entry && t.market == market)
    };

    if let Some(cap) = tc.max_trades_per_hour {
        let since = inp.now - Duration::hours(1);
        let n = entries().filter(|t| t.at > since).count();
        if n >= cap as usize {
            return EntryEvaluation::reject(
                EntryCheck::TradeFrequency,
                format!("Trade frequency cap: {n} entries in the last hour (max {cap})"),
            );
        }
    }
    if let Some(cap) = tc.max_trades_per_day {
        let since = inp.now - Duration::days(1);
        let n = entries().filter(|t| t.at > since).count();
        if n >= cap as usize {
            return EntryEvaluation::reject(
                EntryCheck::TradeFrequency,
                format!("Trade frequency cap: {n} entries in the last 24h (max {cap})"),
            );
        }
    }

    if let Some(cooldown) = tc.cooldown_minutes.filter(|m| *m > 0) {
        let last = inp
            .recent_trades
            .iter()
            .filter(|t| t.market == market)
            .map(|t| t.at)
            .max();
        if let Some(last) = last {
            let elapsed = (inp.now - last).num_seconds() as f64 / 60.0;
            if elapsed < f64::from(cooldown) {
                return EntryEvaluation::reject(
                    EntryCheck::Cooldown,
                    format!("Cooldown: {elapsed:.1} of {cooldown} minutes since last trade"),
                );
            }
        }
    }

    if !tc.allow_same_direction_reentry {
        let last_entry = entries().max_by_key(|t| t.at);
        if let Some(last) = last_entry {
            if last.side == side {
                return EntryEvaluation::reject(
                    EntryCheck::Reentry,
                    format!("Same-direction re-entry ({side}) is disabled"),
                );
            }
        }
    }

    if !cfg.entry.behaviors.any_enabled() {
        return EntryEvaluation::reject(
            EntryCheck::EntryBehavior,
            "No entry behavior is enabled",
        );
    }

    if !(inp.account.equity > 0.0) {
        return EntryEvaluation::reject(
            EntryCheck::Account,
            format!("Account equity ${:.2} is not positive", inp.account.equity),
        );
    }

    EntryEvaluation::pass(format!(
        "Entry conditions met: {} at confidence {:.2}",
        intent.bias, intent.confidence
    ))
}
