//! Look-ahead contamination tests for strategies and indicators.
//!
//! Invariant: nothing evaluated at bar t may depend on bar t+1 or later.
//!
//! Method: evaluate on a truncated series (bars 0..=t) and on the full series,
//! and assert identical output at t. Any difference means future data leaked
//! into the past.

use fibolab_core::data::{generate, SyntheticConfig};
use fibolab_core::domain::Bar;
use fibolab_core::indicators::{precompute, Ema, Indicator, MacdLine, MacdSignal, Rsi};
use fibolab_core::strategy::{Breakout, MeanReversion, Momentum, Retracement, Strategy, TimeExit};

fn test_bars() -> Vec<Bar> {
    generate(&SyntheticConfig {
        bars: 240,
        volatility: 0.03,
        seed: 7,
        ..SyntheticConfig::default()
    })
}

fn assert_indicator_causal(indicator: &dyn Indicator, bars: &[Bar], truncated_len: usize) {
    let full = indicator.compute(bars);
    let truncated = indicator.compute(&bars[..truncated_len]);
    assert_eq!(truncated.len(), truncated_len, "{}", indicator.name());
    for i in 0..truncated_len {
        let (a, b) = (full[i], truncated[i]);
        assert!(
            (a.is_nan() && b.is_nan()) || a == b,
            "{}: bar {i} differs ({a} vs {b})",
            indicator.name()
        );
    }
}

fn assert_strategy_causal(strategy: &dyn Strategy, bars: &[Bar]) {
    let full_values = precompute(bars, &strategy.indicators());
    for t in (0..bars.len()).step_by(7) {
        let prefix = &bars[..=t];
        let prefix_values = precompute(prefix, &strategy.indicators());
        let from_prefix = strategy.evaluate(prefix, t, &prefix_values);
        let from_full = strategy.evaluate(bars, t, &full_values);
        assert_eq!(from_prefix, from_full, "{} differs at bar {t}", strategy.name());
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let bars = test_bars();
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Ema::new(12)),
        Box::new(Rsi::new(14)),
        Box::new(MacdLine::new(12, 26, 9)),
        Box::new(MacdSignal::new(12, 26, 9)),
    ];
    for indicator in &indicators {
        assert_indicator_causal(indicator.as_ref(), &bars, 120);
    }
}

#[test]
fn strategies_are_prefix_deterministic() {
    let bars = test_bars();
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Retracement::default()),
        Box::new(Momentum::default()),
        Box::new(MeanReversion::default()),
        Box::new(Breakout::default()),
        Box::new(TimeExit::default()),
    ];
    for strategy in &strategies {
        assert_strategy_causal(strategy.as_ref(), &bars);
    }
}

#[test]
fn strategies_hold_during_warmup() {
    let bars = test_bars();
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Retracement::default()),
        Box::new(Momentum::default()),
        Box::new(MeanReversion::default()),
        Box::new(Breakout::default()),
    ];
    for strategy in &strategies {
        let values = precompute(&bars, &strategy.indicators());
        for i in 0..strategy.warmup_bars().min(bars.len()) {
            assert!(
                strategy.evaluate(&bars, i, &values).is_hold(),
                "{} emitted before warmup at bar {i}",
                strategy.name()
            );
        }
    }
}
