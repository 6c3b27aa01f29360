use atd_config::RiskLimits;
use atd_schemas::{AccountSnapshot, VenueDescriptor};

/// Names of the individual checks, as they appear in `RiskResult.checks`.
pub mod check {
    pub const INPUT_SANITY: &str = "input_sanity";
    pub const ORDER_SIZE: &str = "order_size";
    pub const MAX_POSITION: &str = "max_position";
    pub const MAX_LEVERAGE: &str = "max_leverage";
    pub const DAILY_LOSS: &str = "daily_loss";
}

/// Everything the evaluator looks at for one proposed entry order.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskInput<'a> {
    /// Notional of the proposed order in USD.
    pub order_notional_usd: f64,
    pub account: &'a AccountSnapshot,
    pub limits: &'a RiskLimits,
    pub venue: &'a VenueDescriptor,
    /// Cap used when `limits.max_position_usd` is unset.
    pub default_max_position_usd: f64,
}

impl RiskInput<'_> {
    /// Position cap actually enforced.
    pub fn max_position_usd(&self) -> f64 {
        self.limits
            .max_position_usd
            .unwrap_or(self.default_max_position_usd)
    }

    /// Configured leverage clamped by the venue.
    pub fn max_leverage(&self) -> f64 {
        self.venue.effective_leverage(self.limits.max_leverage)
    }
}
