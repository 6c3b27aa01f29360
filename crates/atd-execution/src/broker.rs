use std::fmt;

use atd_schemas::{EngineAccountState, MarketSnapshot, OrderIntent, OrderStatus, VenueDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where orders end up. Chosen once when the broker is constructed; consulted
/// by the orchestrator and gateway only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Virtual,
    Live,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Virtual => "virtual",
            ExecutionMode::Live => "live",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call context handed to a broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerContext {
    pub session_id: Uuid,
    pub now: DateTime<Utc>,
    /// The snapshot the decision was made against.
    pub market: MarketSnapshot,
}

/// One order to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Derived from the decision id; stable across retries.
    pub client_order_id: String,
    pub intent: OrderIntent,
}

/// Outcome of `place_order`. Venue rejects are a `Failed` status, not an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderResult {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlaceOrderResult {
    pub fn filled(price: f64, size: f64, venue_order_id: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Filled,
            filled_price: Some(price),
            filled_size: Some(size),
            venue_order_id: Some(venue_order_id.into()),
            error: None,
        }
    }

    pub fn sent(venue_order_id: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Sent,
            filled_price: None,
            filled_size: None,
            venue_order_id: Some(venue_order_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Failed,
            filled_price: None,
            filled_size: None,
            venue_order_id: None,
            error: Some(error.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Skipped,
            filled_price: None,
            filled_size: None,
            venue_order_id: None,
            error: Some(reason.into()),
        }
    }
}

/// Failure to read or update broker-side state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No account exists for the session.
    AccountNotFound(String),
    /// The venue could not be reached or answered garbage.
    Transport(String),
    /// The venue answered with an error.
    Venue(String),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::AccountNotFound(s) => write!(f, "BROKER_ACCOUNT_NOT_FOUND: {s}"),
            BrokerError::Transport(s) => write!(f, "BROKER_TRANSPORT: {s}"),
            BrokerError::Venue(s) => write!(f, "BROKER_VENUE: {s}"),
        }
    }
}

impl std::error::Error for BrokerError {}

/// Capability interface implemented once per venue/mode.
///
/// Implementations hold whatever state they need behind interior mutability;
/// every method takes `&self` so one broker can be shared by a gateway.
#[async_trait::async_trait]
pub trait Broker: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    fn venue(&self) -> &VenueDescriptor;

    /// Place one market order. Never retried by the caller.
    async fn place_order(&self, ctx: &BrokerContext, req: &OrderRequest) -> PlaceOrderResult;

    async fn get_account_state(&self, ctx: &BrokerContext)
        -> Result<EngineAccountState, BrokerError>;

    /// Mark-to-market hook, called once per tick before account state is read.
    async fn on_tick(&self, _ctx: &BrokerContext) -> Result<(), BrokerError> {
        Ok(())
    }
}
