//! Lucas time exit: picks a holding period from the Lucas sequence.
//!
//! Never emits entries. The engine asks [`TimeExit::holding_period`] when a
//! position opens and force-closes it once it has been held longer than that.
//!
//! Realized volatility is the ratio of short-window to long-window standard
//! deviation of close-to-close returns (1.0 = normal):
//! - ratio < low_vol  → L(6) = 18 bars
//! - ratio > high_vol → L(2) = 3 bars
//! - otherwise        → L(4) = 7 bars

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Diagnostics, Signal};
use crate::indicators::stats::{sample_std, simple_returns};
use crate::indicators::IndicatorValues;
use crate::levels::LevelEncoder;

use super::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeExit {
    /// Shorten the period by the volatility ratio when it exceeds 1.
    pub volatility_adjustment: bool,
    pub max_hold: usize,
    pub short_window: usize,
    pub long_window: usize,
    pub low_vol: f64,
    pub high_vol: f64,
    /// Round the period up to the next equilibrium time.
    pub snap_to_equilibrium: bool,
}

impl Default for TimeExit {
    fn default() -> Self {
        Self {
            volatility_adjustment: true,
            max_hold: 47,
            short_window: 10,
            long_window: 50,
            low_vol: 0.5,
            high_vol: 2.0,
            snap_to_equilibrium: false,
        }
    }
}

impl TimeExit {
    /// Short/long return volatility at `index`. 1.0 without enough history.
    pub fn volatility_ratio(&self, bars: &[Bar], index: usize) -> f64 {
        let window = self.long_window.max(self.short_window);
        let closes: Vec<f64> = bars[index.saturating_sub(window)..=index]
            .iter()
            .map(|b| b.close)
            .collect();
        let returns = simple_returns(&closes);
        if self.short_window < 2 || returns.len() < window {
            return 1.0;
        }
        let long = sample_std(&returns[returns.len() - self.long_window..]);
        let short = sample_std(&returns[returns.len() - self.short_window..]);
        if long <= 0.0 {
            return 1.0;
        }
        short / long
    }

    /// Lucas index for a volatility ratio.
    pub fn lucas_index(&self, ratio: f64) -> usize {
        if ratio < self.low_vol {
            6
        } else if ratio > self.high_vol {
            2
        } else {
            4
        }
    }

    /// Holding period in bars for a position opened at `index`.
    pub fn holding_period(&self, bars: &[Bar], index: usize) -> usize {
        let encoder = LevelEncoder::shared();
        let ratio = self.volatility_ratio(bars, index);
        let base = encoder
            .lucas(self.lucas_index(ratio))
            .map(|l| l as usize)
            .unwrap_or(self.max_hold);

        let mut period = if self.volatility_adjustment && ratio > 1.0 {
            ((base as f64 / ratio).floor() as usize).max(1)
        } else {
            base
        };

        if self.snap_to_equilibrium {
            period = snap_up(encoder, period);
        }
        period.min(self.max_hold).max(1)
    }
}

/// `period` if it is itself an equilibrium time, else the next one.
fn snap_up(encoder: &LevelEncoder, period: usize) -> usize {
    let t = period as i64;
    let idx = encoder.encode_time(t);
    let exact = encoder.lucas(idx).is_ok_and(|l| l == period as u128);
    if exact && encoder.is_equilibrium(idx) {
        return period;
    }
    encoder
        .next_equilibrium(t)
        .and_then(|l| usize::try_from(l).ok())
        .unwrap_or(period)
}

impl Strategy for TimeExit {
    fn name(&self) -> &str {
        "lucas_time_exit"
    }

    fn warmup_bars(&self) -> usize {
        0
    }

    fn evaluate(&self, bars: &[Bar], index: usize, _indicators: &IndicatorValues) -> Signal {
        Signal::hold(&bars[index]).with_diagnostics(Diagnostics::TimeExit {
            hold_bars: self.holding_period(bars, index),
        })
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
