//! Serializable backtest configuration.

use chrono::NaiveDate;
use ctalab_core::strategy::ParamMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Everything needed to reproduce one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Instrument symbol the run replays.
    pub symbol: String,

    /// Registered name of the strategy to instantiate
    /// (`double_ma` or `channel_breakout`).
    pub strategy: String,

    /// Strategy parameter overrides; unset parameters keep their defaults.
    #[serde(default)]
    pub params: ParamMap,

    /// Initial capital.
    pub capital: f64,

    /// Commission charged per fill, as a fraction of notional.
    #[serde(default)]
    pub commission_rate: f64,

    /// Adverse price points applied to market fills.
    #[serde(default)]
    pub slippage: f64,

    /// N-minute secondary aggregation window; 0 trades raw bars.
    #[serde(default)]
    pub window: usize,

    /// Inclusive replay date range; `None` replays everything.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,

    /// Abort on non-monotonic event timestamps instead of skipping them.
    #[serde(default)]
    pub strict: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: "rb2410".to_string(),
            strategy: "double_ma".to_string(),
            params: ParamMap::new(),
            capital: 1_000_000.0,
            commission_rate: 0.0,
            slippage: 0.0,
            window: 0,
            start: None,
            end: None,
            strict: false,
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Deterministic content hash. Two identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
