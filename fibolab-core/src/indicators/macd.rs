//! MACD: fast EMA minus slow EMA, plus an EMA of that line (the signal line).
//!
//! Two single-series indicators so the `Indicator` trait stays single-output:
//! - `MacdLine`:   EMA(close, fast) - EMA(close, slow)
//! - `MacdSignal`: EMA(MacdLine, signal)
//!
//! Both EMAs are seeded at the first close, so values exist from bar 0. The
//! lookback reports the slow period because early values are dominated by the
//! seed.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct MacdLine {
    fast: usize,
    slow: usize,
    name: String,
}

impl MacdLine {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && slow >= 1, "MACD periods must be >= 1");
        Self {
            fast,
            slow,
            name: macd_name(fast, slow, signal),
        }
    }
}

impl Indicator for MacdLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        macd_line(&closes(bars), self.fast, self.slow)
    }
}

#[derive(Debug, Clone)]
pub struct MacdSignal {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl MacdSignal {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(
            fast >= 1 && slow >= 1 && signal >= 1,
            "MACD periods must be >= 1"
        );
        Self {
            fast,
            slow,
            signal,
            name: macd_signal_name(fast, slow, signal),
        }
    }
}

impl Indicator for MacdSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let line = macd_line(&closes(bars), self.fast, self.slow);
        ema_of_series(&line, self.signal)
    }
}

pub fn macd_name(fast: usize, slow: usize, signal: usize) -> String {
    format!("macd_{fast}_{slow}_{signal}")
}

pub fn macd_signal_name(fast: usize, slow: usize, signal: usize) -> String {
    format!("macd_signal_{fast}_{slow}_{signal}")
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

fn macd_line(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);
    fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn flat_series_has_zero_macd() {
        let bars = make_bars(&[50.0; 40]);
        let line = MacdLine::new(12, 26, 9).compute(&bars);
        let signal = MacdSignal::new(12, 26, 9).compute(&bars);
        for i in 0..40 {
            assert_approx(line[i], 0.0, DEFAULT_EPSILON);
            assert_approx(signal[i], 0.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn rising_series_has_positive_macd() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let line = MacdLine::new(12, 26, 9).compute(&make_bars(&closes));
        assert_eq!(line[0], 0.0);
        assert!(line[39] > 0.0);
    }

    #[test]
    fn known_values_small_periods() {
        // fast=1 → EMA = close; slow=3 → alpha 0.5 seeded at 10
        // slow: 10, 10.5, 11.25 → line: 0, 0.5, 0.75
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let line = MacdLine::new(1, 3, 3).compute(&bars);
        assert_approx(line[1], 0.5, DEFAULT_EPSILON);
        assert_approx(line[2], 0.75, DEFAULT_EPSILON);
        // signal alpha 0.5 seeded at 0: 0, 0.25, 0.5
        let signal = MacdSignal::new(1, 3, 3).compute(&bars);
        assert_approx(signal[1], 0.25, DEFAULT_EPSILON);
        assert_approx(signal[2], 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn names_encode_periods() {
        assert_eq!(MacdLine::new(12, 26, 9).name(), "macd_12_26_9");
        assert_eq!(MacdSignal::new(12, 26, 9).name(), "macd_signal_12_26_9");
    }
}
