use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Deployment-level knobs read from the `/runtime` section of layered YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Position cap applied when a strategy leaves `max_position_usd` unset.
    pub default_max_position_usd: f64,
    /// Last-resort fuse on any single entry order, independent of strategy
    /// config.
    pub absolute_max_notional_usd: f64,
    /// How long an acquired tick lock stays valid if the holder dies.
    pub tick_lock_ttl_secs: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_max_position_usd: 100.0,
            absolute_max_notional_usd: 10_000.0,
            tick_lock_ttl_secs: 120,
        }
    }
}

impl RuntimeConfig {
    pub(crate) fn deserialize_section(section: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(section.clone()).context("invalid runtime config section")
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.default_max_position_usd.is_finite() && self.default_max_position_usd > 0.0) {
            bail!(
                "runtime.default_max_position_usd must be > 0, got {}",
                self.default_max_position_usd
            );
        }
        if !(self.absolute_max_notional_usd.is_finite() && self.absolute_max_notional_usd > 0.0) {
            bail!(
                "runtime.absolute_max_notional_usd must be > 0, got {}",
                self.absolute_max_notional_usd
            );
        }
        if self.tick_lock_ttl_secs <= 0 {
            bail!(
                "runtime.tick_lock_ttl_secs must be > 0, got {}",
                self.tick_lock_ttl_secs
            );
        }
        Ok(())
    }
}
