use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::AiIntent;
use crate::order::OrderIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Execute,
    Skip,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Execute => "execute",
            DecisionAction::Skip => "skip",
        }
    }
}

/// Which exit rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    MaxLossProtection,
    MaxProfitCap,
    /// Explicit `close` bias from the model.
    AiSignal,
    /// Bias flipped against the held side.
    SignalReversal,
    TakeProfit,
    StopLoss,
    TrailingStop,
    InitialStopLoss,
    MaxHoldTime,
}

impl ExitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitType::MaxLossProtection => "max_loss_protection",
            ExitType::MaxProfitCap => "max_profit_cap",
            ExitType::AiSignal => "ai_signal",
            ExitType::SignalReversal => "signal_reversal",
            ExitType::TakeProfit => "take_profit",
            ExitType::StopLoss => "stop_loss",
            ExitType::TrailingStop => "trailing_stop",
            ExitType::InitialStopLoss => "initial_stop_loss",
            ExitType::MaxHoldTime => "max_hold_time",
        }
    }
}

impl fmt::Display for ExitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the exit rule evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvaluation {
    pub should_exit: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_type: Option<ExitType>,
}

impl ExitEvaluation {
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            should_exit: false,
            reason: reason.into(),
            exit_type: None,
        }
    }

    pub fn exit(exit_type: ExitType, reason: impl Into<String>) -> Self {
        Self {
            should_exit: true,
            reason: reason.into(),
            exit_type: Some(exit_type),
        }
    }
}

/// Outcome of one gate in the decision pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateStatus {
    Passed,
    Failed {
        reason: String,
    },
    #[default]
    NotEvaluated,
}

impl GateStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        GateStatus::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GateStatus::Failed { .. })
    }
}

/// Per-gate audit trail for one decision.
///
/// Gates that were never reached (because an earlier gate failed, or an exit
/// short-circuited the tick) stay `NotEvaluated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResults {
    pub position: GateStatus,
    pub venue: GateStatus,
    pub confidence: GateStatus,
    pub intent: GateStatus,
    pub guardrails: GateStatus,
    pub trade_control: GateStatus,
    pub behaviors: GateStatus,
    pub account: GateStatus,
    pub risk: GateStatus,
}

impl FilterResults {
    /// Name of the first failed gate, in pipeline order.
    pub fn first_failure(&self) -> Option<&'static str> {
        [
            ("position", &self.position),
            ("venue", &self.venue),
            ("confidence", &self.confidence),
            ("intent", &self.intent),
            ("guardrails", &self.guardrails),
            ("trade_control", &self.trade_control),
            ("behaviors", &self.behaviors),
            ("account", &self.account),
            ("risk", &self.risk),
        ]
        .into_iter()
        .find(|(_, g)| g.is_failed())
        .map(|(name, _)| name)
    }
}

/// One named risk limit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Aggregate risk result. Every check is reported, not just the first
/// violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub passed: bool,
    pub checks: Vec<RiskCheck>,
}

impl RiskResult {
    pub fn from_checks(checks: Vec<RiskCheck>) -> Self {
        let passed = checks.iter().all(|c| c.passed);
        Self { passed, checks }
    }

    pub fn violations(&self) -> impl Iterator<Item = &RiskCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// `"; "`-joined violation details, empty when passed.
    pub fn violation_summary(&self) -> String {
        self.violations()
            .map(|c| c.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Full per-tick result of the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub timestamp: DateTime<Utc>,
    pub market: String,
    pub intent: AiIntent,
    pub action: DecisionAction,
    pub action_summary: String,
    pub orders: Vec<OrderIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_result: Option<RiskResult>,
    pub filter_results: FilterResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitEvaluation>,
}

impl StrategyDecision {
    pub fn is_execute(&self) -> bool {
        self.action == DecisionAction::Execute
    }
}
