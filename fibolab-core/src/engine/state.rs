//! Engine configuration, mutable state, and run result types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarError, ClosedTrade, PortfolioState, SignalKind};
use crate::risk::{RejectReason, RiskError};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged on every entry and exit fill.
    pub commission: f64,
    /// Adverse price adjustment for market fills (entries, signal and time exits).
    pub slippage: f64,
    /// Orders below this notional are dropped.
    pub min_notional: f64,
    /// Fraction of cash usable when an order must be shrunk to fit.
    pub cash_buffer: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission: 0.001,
            slippage: 0.001,
            min_notional: 100.0,
            cash_buffer: 0.99,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    /// No commission, no slippage.
    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            commission: 0.0,
            slippage: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let unit = 0.0..1.0;
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !unit.contains(&self.commission) || !unit.contains(&self.slippage) {
            return Err(EngineError::InvalidConfig(format!(
                "commission and slippage must be in [0, 1), got {} / {}",
                self.commission, self.slippage
            )));
        }
        if !(self.cash_buffer > 0.0 && self.cash_buffer <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "cash_buffer must be in (0, 1], got {}",
                self.cash_buffer
            )));
        }
        if !(self.min_notional.is_finite() && self.min_notional >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "min_notional must be non-negative, got {}",
                self.min_notional
            )));
        }
        Ok(())
    }
}

/// Fatal failures. Validation rejections never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid bar series: {0}")]
    Bars(#[from] BarError),
    #[error("sizing failed: {0}")]
    Risk(#[from] RiskError),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

/// A signal the risk manager refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub bar_index: usize,
    pub reason: RejectReason,
}

/// Post-bar snapshot, one per bar, for audit and property checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarAudit {
    pub cash: f64,
    /// Σ(shares × close) over positions open after the bar.
    pub position_value: f64,
    pub open_positions: usize,
    /// Positions opened on this bar.
    pub opened: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl SignalCounts {
    pub fn record(&mut self, kind: SignalKind) {
        match kind {
            SignalKind::Buy => self.buy += 1,
            SignalKind::Sell => self.sell += 1,
            SignalKind::Hold => self.hold += 1,
        }
    }

    /// Buy + Sell.
    pub fn actionable(&self) -> usize {
        self.buy + self.sell
    }
}

/// Mutable state that evolves bar-by-bar during the engine loop.
pub struct EngineState {
    pub portfolio: PortfolioState,
    pub trades: Vec<ClosedTrade>,
    pub rejections: Vec<Rejection>,
    pub dropped_orders: usize,
    pub signal_counts: SignalCounts,
    pub audit: Vec<BarAudit>,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            portfolio: PortfolioState::new(initial_capital),
            trades: Vec::new(),
            rejections: Vec::new(),
            dropped_orders: 0,
            signal_counts: SignalCounts::default(),
            audit: Vec::new(),
        }
    }

    /// Verify the accounting identity `equity == cash + Σ(shares × close)`.
    ///
    /// Returns the current equity. Panics in debug mode if the identity is violated.
    pub fn verify_equity(&self, close: f64) -> f64 {
        let equity = self.portfolio.equity(close);

        #[cfg(debug_assertions)]
        {
            let position_value: f64 = self
                .portfolio
                .positions
                .iter()
                .map(|p| p.shares * close)
                .sum();
            let expected = self.portfolio.cash + position_value;
            assert!(
                (equity - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "equity accounting violated: equity={equity}, cash={} + positions={position_value} = {expected}",
                self.portfolio.cash
            );
        }

        equity
    }
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy_name: String,
    pub initial_capital: f64,
    /// Initial capital followed by one post-bar equity value per bar.
    pub equity_curve: Vec<f64>,
    /// One per bar, aligned with `equity_curve[1..]`.
    pub timestamps: Vec<NaiveDateTime>,
    pub trades: Vec<ClosedTrade>,
    pub final_equity: f64,
    /// Cash after end-of-data liquidation; equals `final_equity`.
    pub final_cash: f64,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub signal_counts: SignalCounts,
    pub rejections: Vec<Rejection>,
    /// Orders dropped for falling below the minimum notional.
    pub dropped_orders: usize,
    pub audit: Vec<BarAudit>,
}

impl RunResult {
    /// `(timestamp, equity)` per bar, for reporting.
    pub fn equity_points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.equity_curve.iter().skip(1).copied())
    }

    /// Fractional return over the run.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital == 0.0 {
            return 0.0;
        }
        self.final_equity / self.initial_capital - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_capital, 100_000.0);
        assert_eq!(config.commission, 0.001);
        assert_eq!(config.slippage, 0.001);
        assert_eq!(config.min_notional, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn engine_config_rejects_nonsense() {
        assert!(EngineConfig::new(0.0).validate().is_err());
        let bad = EngineConfig {
            slippage: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(bad.validate(), Err(EngineError::InvalidConfig(_))));
        let bad = EngineConfig {
            cash_buffer: 0.0,
            ..EngineConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn partial_config_deserializes() {
        let config: EngineConfig = serde_json::from_str(r#"{"commission": 0.0}"#).unwrap();
        assert_eq!(config.commission, 0.0);
        assert_eq!(config.initial_capital, 100_000.0);
    }

    #[test]
    fn engine_state_initial() {
        let state = EngineState::new(100_000.0);
        assert_eq!(state.portfolio.cash, 100_000.0);
        assert_eq!(state.portfolio.equity_curve, vec![100_000.0]);
        assert!(state.trades.is_empty());
        assert_eq!(state.verify_equity(123.0), 100_000.0);
    }

    #[test]
    fn signal_counts_record() {
        let mut c = SignalCounts::default();
        c.record(SignalKind::Buy);
        c.record(SignalKind::Hold);
        c.record(SignalKind::Sell);
        c.record(SignalKind::Hold);
        assert_eq!(c, SignalCounts { buy: 1, sell: 1, hold: 2 });
        assert_eq!(c.actionable(), 2);
    }
}
