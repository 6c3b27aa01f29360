//! atd-strategy
//!
//! The mode-agnostic decision engine:
//! - exit rule evaluation (signal / tp_sl / trailing / time)
//! - entry rule evaluation (first failed check wins)
//! - order sizing against leverage headroom
//! - composition into one `StrategyDecision` per tick
//!
//! Contract:
//! - `decide` is a pure function of `TickInput`. The output timestamp is the
//!   input's `now`; nothing reads a clock, a broker, or a database.
//! - Venue constraints and the default position cap arrive as explicit
//!   inputs. Nothing here knows whether the order will be simulated or live.

mod engine;
mod entry;
mod exit;
mod sizing;
mod trailing;
mod types;

pub use engine::{decide, reference_price};
pub use entry::evaluate_entry;
pub use exit::{evaluate_exit, ExitInput};
pub use sizing::{size_entry, PositionSize, LEVERAGE_HEADROOM};
pub use trailing::{extremes_for, track_extremes};
pub use types::*;
