//! Live exchange broker adapter.
//!
//! Wire formats, signing and HTTP live behind [`ExchangeClient`]; this crate
//! only maps between that collaborator and the `Broker` contract:
//! - venue rejects and transport errors become `status=failed` carrying the
//!   raw error text, never a retry
//! - `on_tick` is a no-op; the exchange is the source of truth for marks
//! - exit orders are sent reduce-only

use std::fmt;

use atd_execution::{
    Broker, BrokerContext, BrokerError, ExecutionMode, OrderRequest, PlaceOrderResult,
};
use atd_schemas::{EngineAccountState, OrderKind, Side, VenueDescriptor};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One market order in venue-neutral terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeOrder {
    pub client_order_id: String,
    pub market: String,
    pub side: Side,
    pub notional_usd: f64,
    pub reduce_only: bool,
}

/// What the venue said about a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExchangeAck {
    /// Accepted, not yet known to be filled.
    Accepted { venue_order_id: String },
    Filled {
        venue_order_id: String,
        price: f64,
        size: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The venue refused the request. Carries the raw venue message.
    Rejected(String),
    /// Network failure, timeout, or an unparseable response.
    Transport(String),
    /// Credentials missing or refused.
    Auth(String),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Rejected(s) => write!(f, "venue rejected: {s}"),
            ExchangeError::Transport(s) => write!(f, "transport error: {s}"),
            ExchangeError::Auth(s) => write!(f, "auth error: {s}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Venue-specific REST client. Implemented outside this workspace.
#[async_trait::async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn submit_market_order(&self, order: &ExchangeOrder) -> Result<ExchangeAck, ExchangeError>;

    async fn fetch_account(&self) -> Result<EngineAccountState, ExchangeError>;
}

pub struct LiveBroker<C: ExchangeClient> {
    client: C,
    venue: VenueDescriptor,
}

impl<C: ExchangeClient> LiveBroker<C> {
    pub fn new(client: C, venue: VenueDescriptor) -> Self {
        Self { client, venue }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait::async_trait]
impl<C: ExchangeClient> Broker for LiveBroker<C> {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Live
    }

    fn venue(&self) -> &VenueDescriptor {
        &self.venue
    }

    async fn place_order(&self, ctx: &BrokerContext, req: &OrderRequest) -> PlaceOrderResult {
        let order = ExchangeOrder {
            client_order_id: req.client_order_id.clone(),
            market: req.intent.market.clone(),
            side: req.intent.side,
            notional_usd: req.intent.notional_usd,
            reduce_only: req.intent.kind == OrderKind::Exit,
        };

        match self.client.submit_market_order(&order).await {
            Ok(ExchangeAck::Filled {
                venue_order_id,
                price,
                size,
            }) => {
                info!(
                    session_id = %ctx.session_id,
                    client_order_id = %order.client_order_id,
                    venue = %self.venue.name,
                    %venue_order_id,
                    price,
                    size,
                    "live order filled"
                );
                PlaceOrderResult::filled(price, size, venue_order_id)
            }
            Ok(ExchangeAck::Accepted { venue_order_id }) => {
                info!(
                    session_id = %ctx.session_id,
                    client_order_id = %order.client_order_id,
                    venue = %self.venue.name,
                    %venue_order_id,
                    "live order accepted"
                );
                PlaceOrderResult::sent(venue_order_id)
            }
            Err(e) => {
                warn!(
                    session_id = %ctx.session_id,
                    client_order_id = %order.client_order_id,
                    venue = %self.venue.name,
                    error = %e,
                    "live order failed"
                );
                PlaceOrderResult::failed(e.to_string())
            }
        }
    }

    async fn get_account_state(
        &self,
        _ctx: &BrokerContext,
    ) -> Result<EngineAccountState, BrokerError> {
        self.client.fetch_account().await.map_err(|e| match e {
            ExchangeError::Transport(s) => BrokerError::Transport(s),
            other => BrokerError::Venue(other.to_string()),
        })
    }
}
