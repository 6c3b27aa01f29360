//! atd-schemas
//!
//! Shared data model for the tick engine.
//!
//! Everything here is plain data: snapshots that flow INTO the decision
//! engine, the intent/decision values that flow OUT of it, and the durable
//! record shapes the persistence layer stores. No IO, no clocks.

mod account;
mod decision;
mod intent;
mod market;
mod order;
mod records;
mod venue;

pub use account::{AccountSnapshot, EngineAccountState, PositionSide, PositionSnapshot};
pub use decision::{
    DecisionAction, ExitEvaluation, ExitType, FilterResults, GateStatus, RiskCheck, RiskResult,
    StrategyDecision,
};
pub use intent::{AiIntent, Bias, PriceZone};
pub use market::{Candle, MarketSnapshot, OrderbookTop};
pub use order::{OrderIntent, OrderKind, OrderStatus, Side};
pub use records::{
    DecisionRecord, OrderRecord, SessionRecord, SessionStatus, TradeRecord, TrailingMark,
};
pub use venue::VenueDescriptor;
