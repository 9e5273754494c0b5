//! Seeded synthetic bar series for demos, benches, and tests.
//!
//! A geometric random walk with daily bars. The seed is explicit; two calls
//! with the same config produce identical series.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::rng::RngHierarchy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub start_price: f64,
    /// Mean per-bar return.
    pub drift: f64,
    /// Per-bar return standard deviation.
    pub volatility: f64,
    pub base_volume: f64,
    pub start: NaiveDate,
    pub seed: u64,
    /// Stream label mixed into the seed, so several series can share one seed.
    pub label: String,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 250,
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.015,
            base_volume: 1_000_000.0,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            seed: 42,
            label: "synthetic".to_string(),
        }
    }
}

/// Generate a random-walk series.
pub fn generate(config: &SyntheticConfig) -> Vec<Bar> {
    let mut rng = RngHierarchy::new(config.seed).rng_for(&config.label, 0);
    let start: NaiveDateTime = config.start.and_hms_opt(0, 0, 0).unwrap_or_default();

    let mut bars = Vec::with_capacity(config.bars);
    let mut prev_close = config.start_price.max(0.01);
    for i in 0..config.bars {
        let z = standard_normal(&mut rng);
        let ret = (config.drift + config.volatility * z).max(-0.5);
        let open = prev_close;
        let close = (open * (1.0 + ret)).max(0.01);

        let wick_up = rng.gen::<f64>() * config.volatility * 0.5;
        let wick_down = rng.gen::<f64>() * config.volatility * 0.5;
        let high = open.max(close) * (1.0 + wick_up);
        let low = open.min(close) * (1.0 - wick_down);
        let volume = config.base_volume * (0.5 + rng.gen::<f64>());

        bars.push(Bar::new(
            start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        ));
        prev_close = close;
    }
    bars
}

/// Box-Muller.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
