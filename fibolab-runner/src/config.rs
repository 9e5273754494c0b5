//! Serializable backtest configuration, loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the documented
//! defaults.
//!
//! ```toml
//! [engine]
//! initial_capital = 50000.0
//!
//! [strategy]
//! type = "retracement"
//! entry_levels = [0.382, 0.618]
//!
//! [time_exit]
//! max_hold = 29
//!
//! [data]
//! csv = "data/spy.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fibolab_core::data::{read_bars_from_path, synthetic, DataError, SyntheticConfig};
use fibolab_core::domain::Bar;
use fibolab_core::engine::EngineConfig;
use fibolab_core::risk::RiskConfig;
use fibolab_core::strategy::{Breakout, MeanReversion, Momentum, Retracement, Strategy, TimeExit};

use crate::learning::LearningConfig;
use crate::metrics::MetricsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Strategy selection plus its parameters, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    Retracement(Retracement),
    Momentum(Momentum),
    MeanReversion(MeanReversion),
    Breakout(Breakout),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Retracement(Retracement::default())
    }
}

impl StrategyConfig {
    /// Every variant with default parameters, in a stable order.
    pub fn all_defaults() -> Vec<StrategyConfig> {
        vec![
            Self::Retracement(Retracement::default()),
            Self::Momentum(Momentum::default()),
            Self::MeanReversion(MeanReversion::default()),
            Self::Breakout(Breakout::default()),
        ]
    }

    /// Parse a variant name ("retracement", "momentum", "mean_reversion",
    /// "breakout") into its default configuration.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "retracement" | "fib_retracement" => Ok(Self::Retracement(Retracement::default())),
            "momentum" => Ok(Self::Momentum(Momentum::default())),
            "mean_reversion" => Ok(Self::MeanReversion(MeanReversion::default())),
            "breakout" => Ok(Self::Breakout(Breakout::default())),
            other => Err(ConfigError::Invalid(format!(
                "unknown strategy '{other}'. Valid: retracement, momentum, mean_reversion, breakout"
            ))),
        }
    }

    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            Self::Retracement(s) => Box::new(s.clone()),
            Self::Momentum(s) => Box::new(s.clone()),
            Self::MeanReversion(s) => Box::new(s.clone()),
            Self::Breakout(s) => Box::new(s.clone()),
        }
    }
}

/// Where bars come from: a CSV file if given, otherwise a seeded synthetic walk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub csv: Option<PathBuf>,
    pub synthetic: SyntheticConfig,
}

impl DataConfig {
    pub fn load(&self) -> Result<Vec<Bar>, DataError> {
        match &self.csv {
            Some(path) => read_bars_from_path(path),
            None => Ok(synthetic::generate(&self.synthetic)),
        }
    }
}

/// Complete, reproducible description of one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub engine: EngineConfig,
    pub risk: RiskConfig,
    pub metrics: MetricsConfig,
    pub strategy: StrategyConfig,
    pub time_exit: Option<TimeExit>,
    pub learning: LearningConfig,
    pub data: DataConfig,
}

impl BacktestConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let risk = &self.risk;
        if risk.max_positions == 0 {
            return Err(ConfigError::Invalid("risk.max_positions must be >= 1".into()));
        }
        if risk.size_tiers.is_empty() {
            return Err(ConfigError::Invalid("risk.size_tiers must not be empty".into()));
        }
        if !(risk.max_position_fraction > 0.0 && risk.max_position_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.max_position_fraction must be in (0, 1], got {}",
                risk.max_position_fraction
            )));
        }
        if self.metrics.periods_per_year == 0 {
            return Err(ConfigError::Invalid("metrics.periods_per_year must be >= 1".into()));
        }
        Ok(())
    }
}
