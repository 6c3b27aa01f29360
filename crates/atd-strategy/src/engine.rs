use atd_risk::{evaluate_order, RiskInput};
use atd_schemas::{
    Bias, DecisionAction, ExitEvaluation, FilterResults, GateStatus, MarketSnapshot, OrderIntent,
    OrderKind, PositionSide, PositionSnapshot, StrategyDecision,
};

use crate::{evaluate_entry, evaluate_exit, extremes_for, size_entry, EntryCheck, ExitInput};
use crate::{EntryEvaluation, TickInput};

/// Compose exit, entry, sizing and risk into one decision.
///
/// - open position: exit rules first; an exit returns immediately and no
///   entry is considered this tick
/// - otherwise entry rules; a failure is a `skip` with the failed gate
///   recorded
/// - a passed entry is sized and risk-checked; only a passing order executes
pub fn decide(inp: &TickInput) -> StrategyDecision {
    let mut exit_eval = None;

    if let Some(pos) = &inp.position {
        let price = reference_price(&inp.market);
        let marked = if price > 0.0 {
            pos.marked_at(price)
        } else {
            pos.clone()
        };
        let (peak, trough) = extremes_for(inp.trailing.as_ref(), &marked, price);
        let age_minutes = (inp.now - marked.opened_at).num_seconds().max(0) as f64 / 60.0;

        let ev = evaluate_exit(&ExitInput {
            position: &marked,
            current_price: price,
            rules: &inp.config.exit,
            intent: &inp.intent,
            peak: Some(peak),
            trough: Some(trough),
            age_minutes,
        });

        if ev.should_exit {
            return exit_decision(inp, &marked, ev);
        }
        exit_eval = Some(ev);
    }

    let entry = evaluate_entry(inp);
    let mut filters = entry_filters(&entry);

    if !entry.can_enter {
        return StrategyDecision {
            timestamp: inp.now,
            market: inp.market.symbol.clone(),
            intent: inp.intent.clone(),
            action: DecisionAction::Skip,
            action_summary: entry.reason,
            orders: Vec::new(),
            risk_result: None,
            filter_results: filters,
            exit: exit_eval,
        };
    }

    let cfg = &inp.config;
    let size = size_entry(
        &inp.account,
        &cfg.risk,
        &inp.venue,
        inp.default_max_position_usd,
        inp.intent.confidence,
        cfg.confidence_scaling(),
    );

    let risk = evaluate_order(&RiskInput {
        order_notional_usd: size.notional_usd,
        account: &inp.account,
        limits: &cfg.risk,
        venue: &inp.venue,
        default_max_position_usd: inp.default_max_position_usd,
    });

    if !risk.passed {
        let summary = format!("Risk check failed: {}", risk.violation_summary());
        filters.risk = GateStatus::failed(risk.violation_summary());
        return StrategyDecision {
            timestamp: inp.now,
            market: inp.market.symbol.clone(),
            intent: inp.intent.clone(),
            action: DecisionAction::Skip,
            action_summary: summary,
            orders: Vec::new(),
            risk_result: Some(risk),
            filter_results: filters,
            exit: exit_eval,
        };
    }
    filters.risk = GateStatus::Passed;

    let (side, label) = match inp.intent.bias {
        Bias::Short => (PositionSide::Short.entry_side(), "short"),
        _ => (PositionSide::Long.entry_side(), "long"),
    };
    let order = OrderIntent {
        market: inp.market.symbol.clone(),
        side,
        notional_usd: size.notional_usd,
        kind: OrderKind::Entry,
        reason: entry.reason,
    };

    StrategyDecision {
        timestamp: inp.now,
        market: inp.market.symbol.clone(),
        intent: inp.intent.clone(),
        action: DecisionAction::Execute,
        action_summary: format!(
            "Enter {label} {} ${:.2} at confidence {:.2}",
            inp.market.symbol, size.notional_usd, inp.intent.confidence
        ),
        orders: vec![order],
        risk_result: Some(risk),
        filter_results: filters,
        exit: exit_eval,
    }
}

/// The one price exits, trailing marks and simulated marks all use.
pub fn reference_price(market: &MarketSnapshot) -> f64 {
    market.reference_price()
}

fn exit_decision(inp: &TickInput, pos: &PositionSnapshot, ev: ExitEvaluation) -> StrategyDecision {
    let order = OrderIntent {
        market: pos.market.clone(),
        side: pos.side.exit_side(),
        notional_usd: pos.entry_notional(),
        kind: OrderKind::Exit,
        reason: ev.reason.clone(),
    };

    StrategyDecision {
        timestamp: inp.now,
        market: inp.market.symbol.clone(),
        intent: inp.intent.clone(),
        action: DecisionAction::Execute,
        action_summary: format!("Exit {} {}: {}", side_label(pos.side), pos.market, ev.reason),
        orders: vec![order],
        risk_result: None,
        filter_results: FilterResults {
            position: GateStatus::Passed,
            ..FilterResults::default()
        },
        exit: Some(ev),
    }
}

fn side_label(side: PositionSide) -> &'static str {
    match side {
        PositionSide::Long => "long",
        PositionSide::Short => "short",
    }
}

/// Gates before the failing one passed, the failing one failed, the rest
/// were never reached.
fn entry_filters(entry: &EntryEvaluation) -> FilterResults {
    // Gate index in pipeline order.
    let failed_at = entry.failed_check.map(|c| match c {
        EntryCheck::Position => 0,
        EntryCheck::VenueConstraint => 1,
        EntryCheck::Confidence => 2,
        EntryCheck::Intent => 3,
        EntryCheck::Guardrail => 4,
        EntryCheck::TradeFrequency | EntryCheck::Cooldown | EntryCheck::Reentry => 5,
        EntryCheck::EntryBehavior => 6,
        EntryCheck::Account => 7,
    });

    let status = |gate: usize| match failed_at {
        Some(f) if gate == f => GateStatus::failed(entry.reason.clone()),
        Some(f) if gate > f => GateStatus::NotEvaluated,
        _ => GateStatus::Passed,
    };

    FilterResults {
        position: status(0),
        venue: status(1),
        confidence: status(2),
        intent: status(3),
        guardrails: status(4),
        trade_control: status(5),
        behaviors: status(6),
        account: status(7),
        risk: GateStatus::NotEvaluated,
    }
}
