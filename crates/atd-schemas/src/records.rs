//! Durable record shapes (decisions, orders, sessions).
//!
//! Decisions and orders are append-only. The only in-place change is the
//! decision's `executed` flag once its order reached the venue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::decision::{DecisionAction, StrategyDecision};
use crate::order::{OrderKind, OrderStatus, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopped => "stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SessionStatus::Running),
            "paused" => Some(SessionStatus::Paused),
            "stopped" => Some(SessionStatus::Stopped),
            _ => None,
        }
    }
}

/// A trading session as loaded at the start of a tick.
///
/// `strategy` is the raw strategy record; the runtime resolves it into a
/// typed config and treats a parse failure as a configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub market: String,
    pub venue: String,
    pub cadence_seconds: i64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub strategy: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub market: String,
    pub action: DecisionAction,
    pub executed: bool,
    pub decision: StrategyDecision,
}

impl DecisionRecord {
    pub fn new(
        decision_id: Uuid,
        session_id: Uuid,
        created_at: DateTime<Utc>,
        decision: StrategyDecision,
    ) -> Self {
        Self {
            decision_id,
            session_id,
            created_at,
            market: decision.market.clone(),
            action: decision.action,
            executed: false,
            decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: Uuid,
    pub decision_id: Uuid,
    pub session_id: Uuid,
    pub client_order_id: String,
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OrderKind>,
    pub notional_usd: f64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An executed order, as seen by the trade-frequency and re-entry rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub market: String,
    pub side: Side,
    pub kind: OrderKind,
    pub at: DateTime<Utc>,
}

/// Running best price since a position opened, for trailing stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingMark {
    pub market: String,
    /// Identifies the position the extremes belong to.
    pub position_opened_at: DateTime<Utc>,
    pub peak: f64,
    pub trough: f64,
}
