//! Z-score mean reversion with golden-ratio bands.
//!
//! Window is the `lookback + 1` closes ending at the current bar. Buy below
//! `-k` standard deviations with the mean as target; sell above `+k`.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Diagnostics, LevelTag, Signal};
use crate::indicators::stats::{mean, sample_std};
use crate::indicators::IndicatorValues;

use super::Strategy;

/// Relative std below which a window is treated as flat.
const FLAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversion {
    pub lookback: usize,
    /// Entry band width in standard deviations.
    pub k: f64,
    pub size_hint: f64,
    pub stop_pct: f64,
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self {
            lookback: 20,
            k: 1.618,
            size_hint: 0.618,
            stop_pct: 0.05,
        }
    }
}

impl MeanReversion {
    /// (mean, sample std, z-score) at `index`. z is 0 for a flat window.
    pub fn z_score(&self, bars: &[Bar], index: usize) -> (f64, f64, f64) {
        let start = index.saturating_sub(self.lookback);
        let closes: Vec<f64> = bars[start..=index].iter().map(|b| b.close).collect();
        let m = mean(&closes);
        let sd = sample_std(&closes);
        let z = if sd <= FLAT_EPSILON * m.abs().max(1.0) {
            0.0
        } else {
            (bars[index].close - m) / sd
        };
        (m, sd, z)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn evaluate(&self, bars: &[Bar], index: usize, _indicators: &IndicatorValues) -> Signal {
        let bar = &bars[index];
        if index < self.warmup_bars() {
            return Signal::hold(bar);
        }

        let (m, sd, z) = self.z_score(bars, index);
        let diagnostics = Diagnostics::MeanReversion {
            mean: m,
            std_dev: sd,
            z_score: z,
        };
        let tag = LevelTag {
            ratio: 0.618,
            fib_index: None,
        };

        if z < -self.k {
            return Signal::buy(bar, bar.close, (z.abs() / 3.0).min(1.0))
                .with_size_hint(self.size_hint)
                .with_stop_loss(bar.close * (1.0 - self.stop_pct))
                .with_take_profit(m)
                .with_level_tag(tag)
                .with_diagnostics(diagnostics);
        }
        if z > self.k {
            return Signal::sell(bar, bar.close, (z / 3.0).min(1.0))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::indicators::make_bars;

    fn closes_then(last: f64) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 101.0 } else { 99.0 })
            .collect();
        closes.push(last);
        closes
    }

    #[test]
    fn flat_series_z_is_zero() {
        let bars = make_bars(&[100.0; 50]);
        let s = MeanReversion::default();
        for i in 0..50 {
            let sig = s.evaluate(&bars, i, &IndicatorValues::new());
            assert!(sig.is_hold());
        }
        assert_eq!(s.z_score(&bars, 30).2, 0.0);
    }

    #[test]
    fn buy_below_lower_band() {
        let bars = make_bars(&closes_then(94.0));
        let sig = MeanReversion::default().evaluate(&bars, 20, &IndicatorValues::new());
        assert_eq!(sig.kind, SignalKind::Buy);
        let Some(Diagnostics::MeanReversion { mean, z_score, .. }) = sig.diagnostics else {
            panic!("expected mean reversion diagnostics");
        };
        assert!(z_score < -1.618);
        assert_eq!(sig.take_profit, Some(mean));
        assert!((sig.stop_loss.unwrap() - 94.0 * 0.95).abs() < 1e-9);
        assert!((sig.confidence - (z_score.abs() / 3.0).min(1.0)).abs() < 1e-12);
    }

    #[test]
    fn sell_above_upper_band() {
        let bars = make_bars(&closes_then(106.0));
        let sig = MeanReversion::default().evaluate(&bars, 20, &IndicatorValues::new());
        assert_eq!(sig.kind, SignalKind::Sell);
    }

    #[test]
    fn inside_band_holds() {
        let bars = make_bars(&closes_then(100.5));
        let sig = MeanReversion::default().evaluate(&bars, 20, &IndicatorValues::new());
        assert!(sig.is_hold());
    }

    #[test]
    fn warmup_holds() {
        let bars = make_bars(&closes_then(80.0));
        let sig = MeanReversion::default().evaluate(&bars, 19, &IndicatorValues::new());
        assert!(sig.is_hold());
        assert!(sig.diagnostics.is_none());
    }
}
