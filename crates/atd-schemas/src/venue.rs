use serde::{Deserialize, Serialize};

/// Static capabilities of a trading venue.
///
/// The data lives with the broker adapter; enforcement happens in the
/// mode-agnostic rule evaluators, which receive this as an explicit argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDescriptor {
    pub name: String,
    pub allows_short: bool,
    pub supports_leverage: bool,
    /// Venue-side leverage ceiling. Ignored when `supports_leverage` is false.
    pub max_leverage: f64,
    pub quote_asset: String,
}

impl VenueDescriptor {
    /// Spot-only venue: long only, 1x.
    pub fn spot(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allows_short: false,
            supports_leverage: false,
            max_leverage: 1.0,
            quote_asset: "USD".to_string(),
        }
    }

    /// Derivatives venue: shorts allowed, leverage up to `max_leverage`.
    pub fn margin(name: impl Into<String>, max_leverage: f64) -> Self {
        Self {
            name: name.into(),
            allows_short: true,
            supports_leverage: true,
            max_leverage,
            quote_asset: "USD".to_string(),
        }
    }

    /// Leverage actually usable on this venue given a configured value.
    pub fn effective_leverage(&self, configured: f64) -> f64 {
        if !self.supports_leverage {
            return 1.0;
        }
        configured.min(self.max_leverage)
    }
}
