//! ClosedTrade: an immutable ledger entry for a completed round trip.

use super::position::Position;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    TimeExit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "SIGNAL",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TimeExit => "TIME_EXIT",
            ExitReason::EndOfData => "END_OF_DATA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    pub shares: f64,
    pub stop_loss: f64,
    pub take_profit: f64,

    /// Entry plus exit commission.
    pub commission: f64,
    /// Net of all commission.
    pub pnl: f64,
    /// Price return in percent: `(exit / entry - 1) * 100`.
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    /// Close `position` at `exit_price`, charging `exit_commission` on top of
    /// the entry commission already paid.
    pub fn from_position(
        position: &Position,
        exit_index: usize,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_commission: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let commission = position.entry_commission + exit_commission;
        let gross = (exit_price - position.entry_price) * position.shares;
        let pnl_pct = if position.entry_price > 0.0 {
            (exit_price / position.entry_price - 1.0) * 100.0
        } else {
            0.0
        };
        Self {
            entry_index: position.entry_index,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_index,
            exit_time,
            exit_price,
            shares: position.shares,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            commission,
            pnl: gross - commission,
            pnl_pct,
            exit_reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}
