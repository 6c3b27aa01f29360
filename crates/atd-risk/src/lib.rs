//! atd-risk
//!
//! Second, independent gate applied to an already-sized order:
//! - zero-size orders
//! - per-order position cap (falls back to a default cap, never unlimited)
//! - post-trade leverage
//! - daily loss against the starting-equity baseline
//!
//! Every check runs and is reported; nothing short-circuits, so an operator
//! sees every violated limit at once.
//!
//! Deterministic, pure logic. No IO, no time, no broker calls.

mod engine;
mod types;

pub use engine::{evaluate_order, validate_inputs};
pub use types::*;
