//! Position: an open long holding created by a filled Buy.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An open position. Owned exclusively by the engine's portfolio state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Bar index at which the position was filled.
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub shares: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Commission paid on entry; folded into the trade's net PnL on close.
    pub entry_commission: f64,
    /// Forced-exit horizon in bars, when a time exit is active.
    pub max_hold_bars: Option<usize>,
}

impl Position {
    /// Entry notional (price × shares), excluding commission.
    pub fn notional(&self) -> f64 {
        self.entry_price * self.shares
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn bars_held(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_index)
    }

    pub fn stop_hit(&self, low: f64) -> bool {
        low <= self.stop_loss
    }

    pub fn target_hit(&self, high: f64) -> bool {
        high >= self.take_profit
    }
}
