//! Signal: a strategy's recommendation for one bar.
//!
//! Signals are portfolio-agnostic and immutable once emitted. Strategy-specific
//! context travels in a typed [`Diagnostics`] payload rather than an open map,
//! so the signal contract stays identical across strategy variants.

use super::bar::Bar;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

/// The Fibonacci level a signal was anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelTag {
    /// Retracement ratio (e.g. 0.618).
    pub ratio: f64,
    /// Fibonacci index of the encoded anchor price, when one was computed.
    pub fib_index: Option<usize>,
}

/// Per-strategy auxiliary values, for diagnostics and reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Diagnostics {
    Retracement {
        swing_high: f64,
        swing_low: f64,
    },
    Momentum {
        rsi: f64,
        macd: f64,
        macd_signal: f64,
    },
    MeanReversion {
        mean: f64,
        std_dev: f64,
        z_score: f64,
    },
    Breakout {
        resistance: f64,
        support: f64,
        volume_ratio: f64,
    },
    TimeExit {
        hold_bars: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub kind: SignalKind,
    pub price: f64,
    /// Requested fraction of available capital, in `[0, 1]`.
    pub size_hint: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub level_tag: Option<LevelTag>,
    pub diagnostics: Option<Diagnostics>,
}

impl Signal {
    /// A no-action signal at the bar's close.
    pub fn hold(bar: &Bar) -> Self {
        Self::new(bar, SignalKind::Hold, 0.0)
    }

    pub fn buy(bar: &Bar, price: f64, confidence: f64) -> Self {
        Self {
            price,
            ..Self::new(bar, SignalKind::Buy, confidence)
        }
    }

    pub fn sell(bar: &Bar, price: f64, confidence: f64) -> Self {
        Self {
            price,
            ..Self::new(bar, SignalKind::Sell, confidence)
        }
    }

    fn new(bar: &Bar, kind: SignalKind, confidence: f64) -> Self {
        Self {
            timestamp: bar.timestamp,
            kind,
            price: bar.close,
            size_hint: 0.0,
            stop_loss: None,
            take_profit: None,
            confidence: unit_clamp(confidence),
            level_tag: None,
            diagnostics: None,
        }
    }

    pub fn with_size_hint(mut self, size_hint: f64) -> Self {
        self.size_hint = unit_clamp(size_hint);
        self
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_level_tag(mut self, tag: LevelTag) -> Self {
        self.level_tag = Some(tag);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn is_hold(&self) -> bool {
        self.kind == SignalKind::Hold
    }
}

/// NaN maps to 0.
fn unit_clamp(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
