//! Per-session strategy rule set.
//!
//! Created when a strategy is authored, versioned by the surrounding strategy
//! record, and immutable during a tick. Every field has a conservative default
//! so a partially specified record still resolves to something safe.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Confidence floor used when neither the entry block nor the guardrails
/// specify one.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.65;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub guardrails: Guardrails,
    pub entry: EntryRules,
    pub exit: ExitRules,
    pub trade_control: TradeControl,
    pub risk: RiskLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guardrails {
    pub min_confidence: Option<f64>,
    pub allow_long: bool,
    pub allow_short: bool,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            min_confidence: None,
            allow_long: true,
            allow_short: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryBehaviors {
    pub trend: bool,
    pub breakout: bool,
    pub mean_reversion: bool,
}

impl Default for EntryBehaviors {
    fn default() -> Self {
        Self {
            trend: true,
            breakout: false,
            mean_reversion: false,
        }
    }
}

impl EntryBehaviors {
    pub fn any_enabled(&self) -> bool {
        self.trend || self.breakout || self.mean_reversion
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceControl {
    pub min_confidence: Option<f64>,
    /// Scale entry notional by the model's confidence.
    pub confidence_scaling: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryRules {
    pub behaviors: EntryBehaviors,
    pub confidence_control: Option<ConfidenceControl>,
}

/// Exit policy. One variant per mode, each carrying only the fields that
/// mode needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExitRules {
    /// Follow the model. The two optional thresholds are emergency overrides
    /// checked before the model's bias.
    Signal {
        #[serde(default)]
        max_loss_protection_pct: Option<f64>,
        #[serde(default)]
        max_profit_cap_pct: Option<f64>,
    },
    TpSl {
        take_profit_pct: f64,
        stop_loss_pct: f64,
    },
    Trailing {
        trailing_stop_pct: f64,
        initial_stop_loss_pct: f64,
    },
    Time {
        max_hold_minutes: f64,
    },
}

impl Default for ExitRules {
    fn default() -> Self {
        ExitRules::Signal {
            max_loss_protection_pct: None,
            max_profit_cap_pct: None,
        }
    }
}

impl ExitRules {
    pub fn mode_name(&self) -> &'static str {
        match self {
            ExitRules::Signal { .. } => "signal",
            ExitRules::TpSl { .. } => "tp_sl",
            ExitRules::Trailing { .. } => "trailing",
            ExitRules::Time { .. } => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeControl {
    pub max_trades_per_hour: Option<u32>,
    pub max_trades_per_day: Option<u32>,
    pub cooldown_minutes: Option<u32>,
    pub allow_same_direction_reentry: bool,
}

impl Default for TradeControl {
    fn default() -> Self {
        Self {
            max_trades_per_hour: None,
            max_trades_per_day: None,
            cooldown_minutes: None,
            allow_same_direction_reentry: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// `None` falls back to the deployment default cap, never to unlimited.
    pub max_position_usd: Option<f64>,
    pub max_leverage: f64,
    pub max_daily_loss_pct: Option<f64>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_usd: None,
            max_leverage: 1.0,
            max_daily_loss_pct: None,
        }
    }
}

impl StrategyConfig {
    /// Parse a strategy record and validate it.
    pub fn from_json(v: &serde_json::Value) -> Result<Self> {
        let cfg: StrategyConfig = serde_json::from_value(v.clone())
            .map_err(|e| anyhow::anyhow!("invalid strategy config: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Entry-block floor, else guardrail floor, else [`DEFAULT_MIN_CONFIDENCE`].
    pub fn effective_min_confidence(&self) -> f64 {
        self.entry
            .confidence_control
            .as_ref()
            .and_then(|c| c.min_confidence)
            .or(self.guardrails.min_confidence)
            .unwrap_or(DEFAULT_MIN_CONFIDENCE)
    }

    pub fn confidence_scaling(&self) -> bool {
        self.entry
            .confidence_control
            .as_ref()
            .map(|c| c.confidence_scaling)
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        for floor in [
            self.guardrails.min_confidence,
            self.entry
                .confidence_control
                .as_ref()
                .and_then(|c| c.min_confidence),
        ]
        .into_iter()
        .flatten()
        {
            if !(0.0..=1.0).contains(&floor) {
                bail!("min_confidence must be within [0, 1], got {floor}");
            }
        }

        if !(self.risk.max_leverage.is_finite() && self.risk.max_leverage > 0.0) {
            bail!("risk.max_leverage must be > 0, got {}", self.risk.max_leverage);
        }
        if let Some(cap) = self.risk.max_position_usd {
            if !(cap.is_finite() && cap >= 0.0) {
                bail!("risk.max_position_usd must be >= 0, got {cap}");
            }
        }
        if let Some(pct) = self.risk.max_daily_loss_pct {
            if !(pct.is_finite() && pct > 0.0) {
                bail!("risk.max_daily_loss_pct must be > 0, got {pct}");
            }
        }

        let positive = |name: &str, v: f64| -> Result<()> {
            if !(v.is_finite() && v > 0.0) {
                bail!("exit.{name} must be > 0, got {v}");
            }
            Ok(())
        };
        match &self.exit {
            ExitRules::Signal {
                max_loss_protection_pct,
                max_profit_cap_pct,
            } => {
                if let Some(v) = max_loss_protection_pct {
                    positive("max_loss_protection_pct", *v)?;
                }
                if let Some(v) = max_profit_cap_pct {
                    positive("max_profit_cap_pct", *v)?;
                }
            }
            ExitRules::TpSl {
                take_profit_pct,
                stop_loss_pct,
            } => {
                positive("take_profit_pct", *take_profit_pct)?;
                positive("stop_loss_pct", *stop_loss_pct)?;
            }
            ExitRules::Trailing {
                trailing_stop_pct,
                initial_stop_loss_pct,
            } => {
                positive("trailing_stop_pct", *trailing_stop_pct)?;
                positive("initial_stop_loss_pct", *initial_stop_loss_pct)?;
            }
            ExitRules::Time { max_hold_minutes } => {
                positive("max_hold_minutes", *max_hold_minutes)?;
            }
        }

        Ok(())
    }
}
