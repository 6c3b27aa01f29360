//! atd-config
//!
//! Two kinds of configuration live here:
//! - the per-session [`StrategyConfig`] (resolved from the strategy record,
//!   immutable for the duration of a tick), and
//! - the deployment-level [`RuntimeConfig`] loaded from layered YAML files.
//!
//! Layered YAML is merged in order (later docs override earlier ones), checked
//! for literal secrets, canonicalized and hashed so a deployment can be tied
//! to the exact config it ran with.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

mod runtime;
mod secrets;
mod strategy;

pub use runtime::RuntimeConfig;
pub use strategy::{
    ConfidenceControl, EntryBehaviors, EntryRules, ExitRules, Guardrails, RiskLimits,
    StrategyConfig, TradeControl, DEFAULT_MIN_CONFIDENCE,
};

/// Merged config plus its identity.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Lowercase hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed runtime settings. Missing keys take their defaults.
    pub fn runtime(&self) -> Result<RuntimeConfig> {
        let cfg = match self.config_json.get("runtime") {
            Some(section) => RuntimeConfig::deserialize_section(section)?,
            None => RuntimeConfig::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Read and merge YAML files in the given order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("read config layer {path}"))
        })
        .collect::<Result<Vec<String>>>()?;

    load_layered_yaml_from_strings(&docs.iter().map(String::as_str).collect::<Vec<_>>())
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: Value = serde_yaml::from_str(raw)
            .with_context(|| format!("config layer {i} is not valid yaml"))?;
        overlay(&mut merged, layer);
    }

    secrets::reject_secret_literals(&merged)?;

    // serde_json's default Map keeps keys sorted, so compact output is canonical.
    let canonical_json =
        serde_json::to_string(&merged).context("serialize canonical config failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `top` replaces `base`.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        into.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
