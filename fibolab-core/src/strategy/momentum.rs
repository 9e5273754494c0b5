//! RSI + MACD momentum.
//!
//! Buy when RSI is oversold and MACD crosses above its signal line on the same
//! bar; sell on the symmetric overbought / bearish-cross condition.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Diagnostics, Signal};
use crate::indicators::macd::{macd_name, macd_signal_name};
use crate::indicators::{Indicator, IndicatorValues, MacdLine, MacdSignal, Rsi};

use super::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Momentum {
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub size_hint: f64,
    /// Stop = close × (1 - stop_pct).
    pub stop_pct: f64,
    /// Target = close × (1 + target_pct).
    pub target_pct: f64,
}

impl Default for Momentum {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            size_hint: 0.382,
            stop_pct: 0.05,
            target_pct: 0.10,
        }
    }
}

/// Readings at one bar plus the MACD pair from the bar before.
struct Readings {
    rsi: f64,
    macd: f64,
    signal: f64,
    prev_macd: f64,
    prev_signal: f64,
}

impl Momentum {
    fn rsi_key(&self) -> String {
        format!("rsi_{}", self.rsi_period)
    }

    fn readings(&self, index: usize, iv: &IndicatorValues) -> Option<Readings> {
        let macd_key = macd_name(self.macd_fast, self.macd_slow, self.macd_signal);
        let signal_key = macd_signal_name(self.macd_fast, self.macd_slow, self.macd_signal);
        let prev = index.checked_sub(1)?;
        let r = Readings {
            rsi: iv.get(&self.rsi_key(), index)?,
            macd: iv.get(&macd_key, index)?,
            signal: iv.get(&signal_key, index)?,
            prev_macd: iv.get(&macd_key, prev)?,
            prev_signal: iv.get(&signal_key, prev)?,
        };
        let all_finite = [r.rsi, r.macd, r.signal, r.prev_macd, r.prev_signal]
            .iter()
            .all(|v| v.is_finite());
        all_finite.then_some(r)
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup_bars(&self) -> usize {
        self.macd_slow.max(self.rsi_period)
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Rsi::new(self.rsi_period)),
            Box::new(MacdLine::new(self.macd_fast, self.macd_slow, self.macd_signal)),
            Box::new(MacdSignal::new(
                self.macd_fast,
                self.macd_slow,
                self.macd_signal,
            )),
        ]
    }

    fn evaluate(&self, bars: &[Bar], index: usize, indicators: &IndicatorValues) -> Signal {
        let bar = &bars[index];
        if index < self.warmup_bars() {
            return Signal::hold(bar);
        }
        let Some(r) = self.readings(index, indicators) else {
            return Signal::hold(bar);
        };
        let diagnostics = Diagnostics::Momentum {
            rsi: r.rsi,
            macd: r.macd,
            macd_signal: r.signal,
        };

        let bullish_cross = r.prev_macd < r.prev_signal && r.macd > r.signal;
        let bearish_cross = r.prev_macd > r.prev_signal && r.macd < r.signal;

        if r.rsi < self.oversold && bullish_cross {
            return Signal::buy(bar, bar.close, 1.0 - r.rsi / 100.0)
                .with_size_hint(self.size_hint)
                .with_stop_loss(bar.close * (1.0 - self.stop_pct))
                .with_take_profit(bar.close * (1.0 + self.target_pct))
                .with_diagnostics(diagnostics);
        }
        if r.rsi > self.overbought && bearish_cross {
            return Signal::sell(bar, bar.close, (r.rsi - 50.0) / 50.0)
                .with_size_hint(1.0)
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
    use crate::indicators::{make_bars, precompute};

    /// Hand-built indicator values: RSI and MACD/signal pairs at bars 29, 30.
    fn scripted(rsi: f64, prev: (f64, f64), now: (f64, f64)) -> IndicatorValues {
        let s = Momentum::default();
        let n = 31;
        let mut rsi_v = vec![50.0; n];
        let mut macd_v = vec![0.0; n];
        let mut sig_v = vec![0.0; n];
        rsi_v[30] = rsi;
        (macd_v[29], sig_v[29]) = prev;
        (macd_v[30], sig_v[30]) = now;
        let mut iv = IndicatorValues::new();
        iv.insert(s.rsi_key(), rsi_v);
        iv.insert(macd_name(12, 26, 9), macd_v);
        iv.insert(macd_signal_name(12, 26, 9), sig_v);
        iv
    }

    fn bars() -> Vec<Bar> {
        make_bars(&[100.0; 31])
    }

    #[test]
    fn buy_on_oversold_bullish_cross() {
        let iv = scripted(22.0, (-1.0, -0.5), (-0.2, -0.4));
        let sig = Momentum::default().evaluate(&bars(), 30, &iv);
        assert_eq!(sig.kind, SignalKind::Buy);
        assert!((sig.confidence - 0.78).abs() < 1e-12);
        assert!((sig.stop_loss.unwrap() - 95.0).abs() < 1e-9);
        assert!((sig.take_profit.unwrap() - 110.0).abs() < 1e-9);
        assert_eq!(sig.size_hint, 0.382);
    }

    #[test]
    fn oversold_without_cross_holds() {
        let iv = scripted(22.0, (-0.2, -0.4), (-0.1, -0.3));
        assert!(Momentum::default().evaluate(&bars(), 30, &iv).is_hold());
    }

    #[test]
    fn cross_without_oversold_holds() {
        let iv = scripted(45.0, (-1.0, -0.5), (-0.2, -0.4));
        assert!(Momentum::default().evaluate(&bars(), 30, &iv).is_hold());
    }

    #[test]
    fn sell_on_overbought_bearish_cross() {
        let iv = scripted(80.0, (1.0, 0.5), (0.2, 0.4));
        let sig = Momentum::default().evaluate(&bars(), 30, &iv);
        assert_eq!(sig.kind, SignalKind::Sell);
        assert!((sig.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn warmup_and_missing_indicators_hold() {
        let s = Momentum::default();
        assert_eq!(s.warmup_bars(), 26);
        let iv = scripted(22.0, (-1.0, -0.5), (-0.2, -0.4));
        assert!(s.evaluate(&bars(), 25, &iv).is_hold());
        assert!(s.evaluate(&bars(), 30, &IndicatorValues::new()).is_hold());
    }

    #[test]
    fn flat_series_never_signals() {
        let s = Momentum::default();
        let bars = make_bars(&[100.0; 60]);
        let iv = precompute(&bars, &s.indicators());
        for i in 0..bars.len() {
            assert!(s.evaluate(&bars, i, &iv).is_hold());
        }
    }
}
