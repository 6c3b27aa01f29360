//! External collaborators consumed by the orchestrator.
//!
//! Venue REST clients and the model client live outside this workspace; they
//! are reached only through these traits.

use anyhow::Result;
use atd_schemas::{AiIntent, Candle, MarketSnapshot, OrderbookTop, SessionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkPrice {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait MarketFeed: Send + Sync {
    async fn get_orderbook_top(&self, market: &str) -> Result<OrderbookTop>;

    async fn get_mark_price(&self, market: &str) -> Result<MarkPrice>;

    /// Recent candles, when the feed has them.
    async fn get_candles(&self, _market: &str) -> Result<Option<Vec<Candle>>> {
        Ok(None)
    }
}

/// Produces the one AI intent for a tick.
///
/// `Ok(None)` means the provider has nothing for this session (no model
/// connection configured); the orchestrator treats that as a configuration
/// error, not as a neutral intent.
#[async_trait::async_trait]
pub trait IntentProvider: Send + Sync {
    async fn intent_for(
        &self,
        session: &SessionRecord,
        market: &MarketSnapshot,
    ) -> Result<Option<AiIntent>>;
}
