use std::fmt;

use atd_config::StrategyConfig;
use atd_schemas::{
    AccountSnapshot, AiIntent, MarketSnapshot, PositionSnapshot, TradeRecord, TrailingMark,
    VenueDescriptor,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position cap used when neither the strategy nor the deployment sets one.
pub const DEFAULT_MAX_POSITION_USD: f64 = 100.0;

fn default_max_position_usd() -> f64 {
    DEFAULT_MAX_POSITION_USD
}

/// Everything the engine needs for one tick, owned by the caller.
///
/// Both execution modes must build this from the same values; the engine has
/// no other source of information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Stamped onto the decision. Also the reference point for position age
    /// and trade-frequency windows.
    pub now: DateTime<Utc>,
    pub market: MarketSnapshot,
    /// Open position for `market.symbol`, if any.
    #[serde(default)]
    pub position: Option<PositionSnapshot>,
    pub account: AccountSnapshot,
    pub intent: AiIntent,
    #[serde(default)]
    pub config: StrategyConfig,
    pub venue: VenueDescriptor,
    /// Executed trades for this session, any order.
    #[serde(default)]
    pub recent_trades: Vec<TradeRecord>,
    /// Tracked peak/trough for the open position, if the caller has one.
    #[serde(default)]
    pub trailing: Option<TrailingMark>,
    #[serde(default = "default_max_position_usd")]
    pub default_max_position_usd: f64,
}

/// Which entry check rejected the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCheck {
    Position,
    VenueConstraint,
    Confidence,
    /// neutral / hold / close bias: the model did not ask for an entry.
    Intent,
    /// The model asked for a side the strategy has switched off.
    Guardrail,
    TradeFrequency,
    Cooldown,
    Reentry,
    EntryBehavior,
    Account,
}

impl EntryCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCheck::Position => "position",
            EntryCheck::VenueConstraint => "venue_constraint",
            EntryCheck::Confidence => "confidence",
            EntryCheck::Intent => "intent",
            EntryCheck::Guardrail => "guardrail",
            EntryCheck::TradeFrequency => "trade_frequency",
            EntryCheck::Cooldown => "cooldown",
            EntryCheck::Reentry => "reentry",
            EntryCheck::EntryBehavior => "entry_behavior",
            EntryCheck::Account => "account",
        }
    }
}

impl fmt::Display for EntryCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryEvaluation {
    pub can_enter: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_check: Option<EntryCheck>,
}

impl EntryEvaluation {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            can_enter: true,
            reason: reason.into(),
            failed_check: None,
        }
    }

    pub fn reject(check: EntryCheck, reason: impl Into<String>) -> Self {
        Self {
            can_enter: false,
            reason: reason.into(),
            failed_check: Some(check),
        }
    }
}
