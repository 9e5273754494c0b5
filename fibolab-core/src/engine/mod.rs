//! Backtesting engine: bar-by-bar simulation loop and fill accounting.
//!
//! The engine consumes a validated bar series and one strategy, then runs the
//! five-phase bar loop:
//!
//! 1. EvaluateSignal: strategy sees bars `0..=i` only
//! 2. Size/Validate: risk manager approves and sizes Buy signals
//! 3. Fill: open at most one position, or flatten all on Sell
//! 4. CheckProtectiveLevels: stop-loss beats take-profit on the same bar
//! 5. MarkToMarket: equity = cash + Σ(shares × close)

pub mod accounting;
pub mod loop_runner;
pub mod state;

pub use accounting::EntryOrder;
pub use loop_runner::SimulationEngine;
pub use state::{
    BarAudit, EngineConfig, EngineError, EngineState, Rejection, RunResult, SignalCounts,
};
