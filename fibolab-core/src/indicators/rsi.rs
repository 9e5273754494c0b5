//! Relative Strength Index (RSI).
//!
//! Seeded with the simple average of the first `period` gains and losses,
//! then Wilder-smoothed. RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: no movement → 50; avg_loss == 0 → 100; avg_gain == 0 → 0.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// RSI over an arbitrary series. NaN inputs taint the rest of the output.
pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    // (gain, loss) per step; index i describes values[i] - values[i-1].
    let moves: Vec<(f64, f64)> = values
        .windows(2)
        .map(|w| {
            let ch = w[1] - w[0];
            (ch.max(0.0), (-ch).max(0.0))
        })
        .collect();

    let seed = &moves[..period];
    if seed.iter().any(|(g, l)| g.is_nan() || l.is_nan()) {
        return result;
    }
    let mut avg_gain = seed.iter().map(|m| m.0).sum::<f64>() / period as f64;
    let mut avg_loss = seed.iter().map(|m| m.1).sum::<f64>() / period as f64;
    result[period] = rsi_from_averages(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for (offset, &(gain, loss)) in moves[period..].iter().enumerate() {
        if gain.is_nan() || loss.is_nan() {
            break;
        }
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[period + 1 + offset] = rsi_from_averages(avg_gain, avg_loss);
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (false, true) => 100.0,
        (true, false) => 0.0,
        (false, false) => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_is_neutral() {
        let result = rsi_of_series(&[50.0; 20], 14);
        assert_approx(result[14], 50.0, 1e-9);
        assert_approx(result[19], 50.0, 1e-9);
    }

    #[test]
    fn rsi_seed_value() {
        // Changes: +0.34, -0.25, -0.48 → avg_gain 0.34/3, avg_loss 0.73/3
        // RSI = 100 - 100/(1 + 0.34/0.73)
        let result = rsi_of_series(&[44.0, 44.34, 44.09, 43.61], 3);
        let expected = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], expected, 1e-9);
    }

    #[test]
    fn rsi_wilder_step() {
        // Seed on +1,+1 → gain 1, loss 0; next move -2:
        // gain = 0.5*0 + 0.5*1 = 0.5, loss = 0.5*2 + 0.5*0 = 1.0 → RSI = 100/3
        let result = rsi_of_series(&[10.0, 11.0, 12.0, 10.0], 2);
        assert_approx(result[2], 100.0, 1e-9);
        assert_approx(result[3], 100.0 / 3.0, 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let result = Rsi::new(3).compute(&bars);
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn rsi_short_series_all_nan() {
        let result = rsi_of_series(&[1.0, 2.0, 3.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_nan_in_seed() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        bars[2].close = f64::NAN;
        let result = Rsi::new(3).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
