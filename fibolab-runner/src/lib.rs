//! Fibolab Runner: backtest orchestration, metrics, comparison, learning hand-off.
//!
//! This crate builds on `fibolab-core` to provide:
//! - TOML configuration and the strategy factory
//! - Single-backtest runner with metrics
//! - Parallel multi-strategy comparison and Retracement level grid search
//! - Learning-store sink for qualifying runs
//! - JSON / CSV / Markdown export

pub mod config;
pub mod export;
pub mod learning;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, DataConfig, StrategyConfig};
pub use learning::{
    submit_if_qualified, CommandSink, LearningConfig, LearningRecord, LearningSink, MemorySink,
    SinkError,
};
pub use metrics::{Metrics, MetricsConfig, PerformanceAnalyzer};
pub use runner::{run_from_config, run_single, run_strategy, BacktestReport, RunError, RunSettings};
pub use sweep::{best_by_sharpe, compare, default_level_grid, grid_search_retracement, GridPoint};
