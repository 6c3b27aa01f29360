use std::fmt;

use serde::{Deserialize, Serialize};

/// Directional call from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Long,
    Short,
    Neutral,
    Hold,
    Close,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bias::Long => "long",
            Bias::Short => "short",
            Bias::Neutral => "neutral",
            Bias::Hold => "hold",
            Bias::Close => "close",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceZone {
    pub low: f64,
    pub high: f64,
}

/// The model's structured output for one tick.
///
/// Treated as one atomic input: virtual and live evaluation must see the
/// same value for parity to mean anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiIntent {
    pub bias: Bias,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_zone: Option<PriceZone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

impl AiIntent {
    pub fn new(bias: Bias, confidence: f64) -> Self {
        Self {
            bias,
            confidence,
            entry_zone: None,
            stop_loss: None,
            take_profit: None,
            reasoning: String::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}
