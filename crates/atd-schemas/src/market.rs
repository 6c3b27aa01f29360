use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle, oldest-first when carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Best bid/ask as returned by a venue feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderbookTop {
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
}

impl OrderbookTop {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self {
            bid,
            ask,
            mid: (bid + ask) / 2.0,
        }
    }
}

/// Venue-agnostic view of one instrument at one instant.
///
/// Built fresh every tick by the orchestrator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candles: Option<Vec<Candle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderbook: Option<OrderbookTop>,
}

impl MarketSnapshot {
    /// Snapshot with a flat book (bid == ask == last). Handy for tests and replays.
    pub fn at_price(symbol: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: price,
            bid: price,
            ask: price,
            timestamp,
            candles: None,
            orderbook: None,
        }
    }

    /// Price positions are marked and judged at: last trade, else book mid.
    /// Zero when neither is quoted.
    pub fn reference_price(&self) -> f64 {
        if self.last_price > 0.0 {
            self.last_price
        } else if self.bid > 0.0 && self.ask > 0.0 {
            (self.bid + self.ask) / 2.0
        } else {
            0.0
        }
    }

    /// Price a market buy would pay: the ask when quoted, otherwise last.
    pub fn buy_price(&self) -> f64 {
        if self.ask > 0.0 {
            self.ask
        } else {
            self.last_price
        }
    }

    /// Price a market sell would receive: the bid when quoted, otherwise last.
    pub fn sell_price(&self) -> f64 {
        if self.bid > 0.0 {
            self.bid
        } else {
            self.last_price
        }
    }
}
