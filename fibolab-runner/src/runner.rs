//! Backtest runner: wires strategy, engine, and metrics together.
//!
//! Two entry points:
//! - `run_single()`: builds the strategy from a [`BacktestConfig`]. Used by the CLI.
//! - `run_strategy()`: takes an already-built strategy and shared settings.
//!   Used by comparison and grid search.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use fibolab_core::data::DataError;
use fibolab_core::domain::Bar;
use fibolab_core::engine::{EngineConfig, EngineError, RunResult, SimulationEngine};
use fibolab_core::risk::{RiskConfig, RiskManager};
use fibolab_core::strategy::{Strategy, TimeExit};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::{Metrics, MetricsConfig, PerformanceAnalyzer};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Everything but the strategy: shared across a comparison or a grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub engine: EngineConfig,
    pub risk: RiskConfig,
    pub metrics: MetricsConfig,
    pub time_exit: Option<TimeExit>,
}

impl RunSettings {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            risk: config.risk.clone(),
            metrics: config.metrics.clone(),
            time_exit: config.time_exit.clone(),
        }
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub result: RunResult,
    pub metrics: Metrics,
    /// Strategy parameter snapshot.
    pub params: serde_json::Value,
}

impl BacktestReport {
    pub fn strategy_name(&self) -> &str {
        &self.result.strategy_name
    }
}

/// Run one strategy over `bars` and summarize the result.
pub fn run_strategy(
    strategy: &dyn Strategy,
    bars: &[Bar],
    settings: &RunSettings,
) -> Result<BacktestReport, RunError> {
    let mut engine = SimulationEngine::new(
        settings.engine.clone(),
        RiskManager::new(settings.risk.clone()),
        strategy,
    );
    if let Some(time_exit) = &settings.time_exit {
        engine = engine.with_time_exit(time_exit.clone());
    }
    let result = engine.run(bars)?;
    let metrics =
        PerformanceAnalyzer::new(settings.metrics.clone()).summarize(&result.equity_curve, &result.trades);

    info!(
        strategy = strategy.name(),
        total_return = metrics.total_return,
        sharpe = metrics.sharpe_ratio,
        trades = metrics.total_trades,
        "run summarized"
    );

    Ok(BacktestReport {
        result,
        metrics,
        params: strategy.params(),
    })
}

/// Build the configured strategy and run it over `bars`.
pub fn run_single(config: &BacktestConfig, bars: &[Bar]) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let strategy = config.strategy.build();
    run_strategy(strategy.as_ref(), bars, &RunSettings::from_config(config))
}

/// Load the configured data source, then run.
pub fn run_from_config(config: &BacktestConfig) -> Result<BacktestReport, RunError> {
    let bars = config.data.load()?;
    run_single(config, &bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use fibolab_core::data::{generate, SyntheticConfig};
    use fibolab_core::strategy::Momentum;

    fn bars() -> Vec<Bar> {
        generate(&SyntheticConfig {
            bars: 300,
            volatility: 0.02,
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn report_carries_params_and_matching_curve() {
        let config = BacktestConfig {
            strategy: StrategyConfig::Momentum(Momentum::default()),
            ..BacktestConfig::default()
        };
        let bars = bars();
        let report = run_single(&config, &bars).unwrap();
        assert_eq!(report.strategy_name(), "momentum");
        assert_eq!(report.result.equity_curve.len(), bars.len() + 1);
        assert_eq!(report.params, Momentum::default().params());
        assert_eq!(report.metrics.total_trades, report.result.trades.len());
        assert!((report.metrics.total_return - report.result.total_return()).abs() < 1e-12);
    }

    #[test]
    fn runs_are_deterministic() {
        let config = BacktestConfig::default();
        let bars = bars();
        let a = run_single(&config, &bars).unwrap();
        let b = run_single(&config, &bars).unwrap();
        assert_eq!(a.result.equity_curve, b.result.equity_curve);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn empty_series_is_an_engine_error() {
        let err = run_single(&BacktestConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, RunError::Engine(_)));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let mut config = BacktestConfig::default();
        config.risk.max_positions = 0;
        let err = run_single(&config, &bars()).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn synthetic_source_by_default() {
        let report = run_from_config(&BacktestConfig::default()).unwrap();
        assert_eq!(report.result.bar_count, 250);
    }
}
