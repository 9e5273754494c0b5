//! Strategy trait and concrete variants.
//!
//! Strategies are portfolio-agnostic: they receive bar history and
//! precomputed indicator values, never portfolio or position state. The same
//! prefix always yields the same [`Signal`].

pub mod breakout;
pub mod mean_reversion;
pub mod momentum;
pub mod retracement;
pub mod time_exit;

pub use breakout::Breakout;
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use retracement::Retracement;
pub use time_exit::TimeExit;

use crate::domain::{Bar, Signal};
use crate::indicators::{Indicator, IndicatorValues};

/// A rule-based trading strategy.
///
/// # Architecture invariant
/// `evaluate` receives only bar history and indicator values. It may read
/// `bars[0..=index]` and nothing later. Before `warmup_bars()` it returns
/// `Hold`.
pub trait Strategy: Send + Sync {
    /// Stable identifier (e.g., "mean_reversion").
    fn name(&self) -> &str;

    /// Bars required before the strategy can emit anything but `Hold`.
    fn warmup_bars(&self) -> usize;

    /// Indicators the engine must precompute before the bar loop.
    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        Vec::new()
    }

    fn evaluate(&self, bars: &[Bar], index: usize, indicators: &IndicatorValues) -> Signal;

    /// Parameter snapshot, used for fingerprints and learning records.
    fn params(&self) -> serde_json::Value;
}
