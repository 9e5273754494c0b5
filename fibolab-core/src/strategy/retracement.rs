//! Fibonacci retracement: buy pullbacks to a retracement level of the
//! trailing swing range, sell near the swing high.
//!
//! Levels are measured down from the swing high: `high - ratio * (high - low)`.
//! When several levels are within tolerance the closest one wins. Confidence
//! peaks at the 0.618 level.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Diagnostics, LevelTag, Signal};
use crate::indicators::IndicatorValues;
use crate::levels::{price_to_ticks, LevelEncoder};

use super::Strategy;

const GOLDEN: f64 = 0.618;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Retracement {
    /// Swing window is `[index - lookback, index]`.
    pub lookback: usize,
    pub entry_levels: Vec<f64>,
    /// Max relative distance `|close - level| / level` to count as a touch.
    pub tolerance: f64,
    /// Take-profit extension of the swing range, measured from the swing low.
    pub extension: f64,
    /// Stop = swing_low × stop_factor.
    pub stop_factor: f64,
    /// Sell when close ≥ swing_high × exit_proximity.
    pub exit_proximity: f64,
    pub size_hint: f64,
}

impl Default for Retracement {
    fn default() -> Self {
        Self {
            lookback: 20,
            entry_levels: vec![0.382, 0.5, 0.618],
            tolerance: 0.01,
            extension: 1.618,
            stop_factor: 0.95,
            exit_proximity: 0.99,
            size_hint: 0.618,
        }
    }
}

impl Retracement {
    pub fn with_levels(entry_levels: Vec<f64>) -> Self {
        Self {
            entry_levels,
            ..Self::default()
        }
    }

    /// Highest high and lowest low over the swing window ending at `index`.
    pub fn swing_points(&self, bars: &[Bar], index: usize) -> (f64, f64) {
        let start = index.saturating_sub(self.lookback);
        bars[start..=index]
            .iter()
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), b| {
                (hi.max(b.high), lo.min(b.low))
            })
    }

    /// Closest entry level within tolerance of `price`, with its level price.
    fn touched_level(&self, price: f64, swing_high: f64, range: f64) -> Option<(f64, f64)> {
        self.entry_levels
            .iter()
            .map(|&ratio| (ratio, swing_high - range * ratio))
            .filter(|&(_, level)| level > 0.0)
            .map(|(ratio, level)| (ratio, level, (price - level).abs() / level))
            .filter(|&(_, _, dist)| dist < self.tolerance)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(ratio, level, _)| (ratio, level))
    }
}

impl Strategy for Retracement {
    fn name(&self) -> &str {
        "fib_retracement"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn evaluate(&self, bars: &[Bar], index: usize, _indicators: &IndicatorValues) -> Signal {
        let bar = &bars[index];
        if index < self.warmup_bars() {
            return Signal::hold(bar);
        }

        let (swing_high, swing_low) = self.swing_points(bars, index);
        let range = swing_high - swing_low;
        if range <= 0.0 {
            return Signal::hold(bar);
        }
        let diagnostics = Diagnostics::Retracement {
            swing_high,
            swing_low,
        };

        if let Some((ratio, _level)) = self.touched_level(bar.close, swing_high, range) {
            let confidence = 1.0 - (ratio - GOLDEN).abs() / GOLDEN;
            let fib_index = price_to_ticks(bar.close, 1)
                .ok()
                .map(|ticks| LevelEncoder::shared().encode_price(ticks));
            return Signal::buy(bar, bar.close, confidence)
                .with_size_hint(self.size_hint)
                .with_stop_loss(swing_low * self.stop_factor)
                .with_take_profit(swing_low + range * self.extension)
                .with_level_tag(LevelTag { ratio, fib_index })
                .with_diagnostics(diagnostics);
        }

        if bar.close >= swing_high * self.exit_proximity {
            return Signal::sell(bar, bar.close, 0.8)
                .with_size_hint(1.0)
                .with_level_tag(LevelTag {
                    ratio: 1.0,
                    fib_index: None,
                })
                .with_diagnostics(diagnostics);
        }

        Signal::hold(bar).with_diagnostics(diagnostics)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::strategy::test_util::bars_from;

    /// 21 bars swinging between 100 and 80 (range 20), then a final close.
    fn swing_then(close: f64) -> Vec<Bar> {
        let mut rows = vec![(100.0, 95.0, 98.0, 1000.0)];
        rows.extend((0..19).map(|_| (92.0, 88.0, 90.0, 1000.0)));
        rows.push((92.0, 80.0, 85.0, 1000.0));
        rows.push((close.max(86.0), close.min(86.0), close, 1000.0));
        bars_from(&rows)
    }

    #[test]
    fn holds_during_warmup() {
        let bars = swing_then(87.64);
        let s = Retracement::default();
        for i in 0..20 {
            assert!(s.evaluate(&bars, i, &IndicatorValues::new()).is_hold());
        }
    }

    #[test]
    fn buys_at_golden_level() {
        // Window [1, 21]: swing high 92, low 80, range 12.
        // 0.618 level = 92 - 7.416 = 84.584
        let bars = swing_then(84.6);
        let s = Retracement::default();
        let sig = s.evaluate(&bars, 21, &IndicatorValues::new());
        assert_eq!(sig.kind, SignalKind::Buy);
        let tag = sig.level_tag.unwrap();
        assert_eq!(tag.ratio, 0.618);
        assert_eq!(tag.fib_index, Some(10)); // 85 → F(10) = 55
        assert!((sig.confidence - 1.0).abs() < 1e-12);
        assert!((sig.stop_loss.unwrap() - 76.0).abs() < 1e-9);
        assert!((sig.take_profit.unwrap() - (80.0 + 12.0 * 1.618)).abs() < 1e-9);
        assert_eq!(sig.size_hint, 0.618);
    }

    #[test]
    fn lower_confidence_away_from_golden() {
        // 0.382 level = 92 - 4.584 = 87.416
        let bars = swing_then(87.4);
        let sig = Retracement::default().evaluate(&bars, 21, &IndicatorValues::new());
        assert_eq!(sig.kind, SignalKind::Buy);
        assert_eq!(sig.level_tag.unwrap().ratio, 0.382);
        assert!(sig.confidence < 0.7);
    }

    #[test]
    fn sells_near_swing_high() {
        let bars = swing_then(91.5);
        let sig = Retracement::default().evaluate(&bars, 21, &IndicatorValues::new());
        assert_eq!(sig.kind, SignalKind::Sell);
        assert_eq!(sig.confidence, 0.8);
    }

    #[test]
    fn holds_between_levels() {
        let bars = swing_then(89.3);
        let sig = Retracement::default().evaluate(&bars, 21, &IndicatorValues::new());
        assert!(sig.is_hold());
        assert!(matches!(
            sig.diagnostics,
            Some(Diagnostics::Retracement { .. })
        ));
    }

    #[test]
    fn flat_range_holds() {
        let bars = bars_from(&vec![(50.0, 50.0, 50.0, 10.0); 30]);
        let sig = Retracement::default().evaluate(&bars, 25, &IndicatorValues::new());
        assert!(sig.is_hold());
    }

    #[test]
    fn params_snapshot() {
        let p = Retracement::default().params();
        assert_eq!(p["lookback"], 20);
        assert_eq!(p["entry_levels"].as_array().unwrap().len(), 3);
    }
}
