//! Volume-confirmed range breakout.
//!
//! Resistance/support are the highest high / lowest low of the `lookback` bars
//! before the current one. A breakout needs the bar's extreme to clear the
//! level by more than `threshold × range` on a volume surge.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Diagnostics, LevelTag, Signal};
use crate::indicators::IndicatorValues;

use super::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakout {
    pub lookback: usize,
    pub volume_multiplier: f64,
    /// Minimum penetration as a fraction of the trailing range.
    pub threshold: f64,
    /// Target = resistance + extension × range.
    pub extension: f64,
    /// Stop = resistance × stop_factor.
    pub stop_factor: f64,
    pub size_hint: f64,
}

impl Default for Breakout {
    fn default() -> Self {
        Self {
            lookback: 20,
            volume_multiplier: 1.618,
            threshold: 0.02,
            extension: 1.618,
            stop_factor: 0.98,
            size_hint: 0.382,
        }
    }
}

/// Trailing range statistics for the window before a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingRange {
    pub resistance: f64,
    pub support: f64,
    pub avg_volume: f64,
}

impl Breakout {
    pub fn trailing_range(&self, bars: &[Bar], index: usize) -> TrailingRange {
        let window = &bars[index.saturating_sub(self.lookback)..index];
        let (resistance, support) = window
            .iter()
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), b| {
                (hi.max(b.high), lo.min(b.low))
            });
        let avg_volume = window.iter().map(|b| b.volume).sum::<f64>() / window.len().max(1) as f64;
        TrailingRange {
            resistance,
            support,
            avg_volume,
        }
    }
}

impl Strategy for Breakout {
    fn name(&self) -> &str {
        "breakout"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback.max(1)
    }

    fn evaluate(&self, bars: &[Bar], index: usize, _indicators: &IndicatorValues) -> Signal {
        let bar = &bars[index];
        if index < self.warmup_bars() {
            return Signal::hold(bar);
        }

        let tr = self.trailing_range(bars, index);
        let range = tr.resistance - tr.support;
        if range <= 0.0 || tr.avg_volume <= 0.0 {
            return Signal::hold(bar);
        }
        let volume_ratio = bar.volume / tr.avg_volume;
        let diagnostics = Diagnostics::Breakout {
            resistance: tr.resistance,
            support: tr.support,
            volume_ratio,
        };
        let surge = bar.volume > tr.avg_volume * self.volume_multiplier;
        let confidence = (volume_ratio / 3.0).min(1.0);
        let tag = LevelTag {
            ratio: self.extension,
            fib_index: None,
        };

        if surge
            && bar.high > tr.resistance
            && (bar.high - tr.resistance) / range > self.threshold
        {
            return Signal::buy(bar, bar.close, confidence)
                .with_size_hint(self.size_hint)
                .with_stop_loss(tr.resistance * self.stop_factor)
                .with_take_profit(tr.resistance + range * self.extension)
                .with_level_tag(tag)
                .with_diagnostics(diagnostics);
        }
        if surge && bar.low < tr.support && (tr.support - bar.low) / range > self.threshold {
            return Signal::sell(bar, bar.close, confidence)
                .with_size_hint(1.0)
                .with_level_tag(tag)
                .with_diagnostics(diagnostics);
        }

        Signal::hold(bar).with_diagnostics(diagnostics)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
