use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Entry,
    Exit,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Entry => "entry",
            OrderKind::Exit => "exit",
        }
    }
}

/// Venue-agnostic order description. Output-only; never mutated after
/// the engine creates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub market: String,
    pub side: Side,
    pub notional_usd: f64,
    pub kind: OrderKind,
    pub reason: String,
}

/// Lifecycle status of an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Sent,
    Filled,
    Failed,
    Skipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Sent => "sent",
            OrderStatus::Filled => "filled",
            OrderStatus::Failed => "failed",
            OrderStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(OrderStatus::Sent),
            "filled" => Some(OrderStatus::Filled),
            "failed" => Some(OrderStatus::Failed),
            "skipped" => Some(OrderStatus::Skipped),
            _ => None,
        }
    }

    /// True when the order reached the venue.
    pub fn is_executed(&self) -> bool {
        matches!(self, OrderStatus::Sent | OrderStatus::Filled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
