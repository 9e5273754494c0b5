//! Multi-strategy comparison and Retracement level grid search.
//!
//! Each run gets its own engine and state; nothing is shared across the
//! rayon workers except the read-only bar slice. Output order always matches
//! input order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use fibolab_core::domain::Bar;
use fibolab_core::strategy::Retracement;

use crate::config::StrategyConfig;
use crate::metrics::Metrics;
use crate::runner::{run_strategy, BacktestReport, RunError, RunSettings};

/// Run every strategy over the same bars in parallel.
///
/// Results are in the same order as `strategies`. The first failure is
/// returned; a failure in one run does not affect the others' state.
pub fn compare(
    strategies: &[StrategyConfig],
    bars: &[Bar],
    settings: &RunSettings,
) -> Result<Vec<BacktestReport>, RunError> {
    let reports = strategies
        .par_iter()
        .map(|config| {
            let strategy = config.build();
            run_strategy(strategy.as_ref(), bars, settings)
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(strategies = reports.len(), "comparison complete");
    Ok(reports)
}

/// Entry-level combinations searched by default.
pub fn default_level_grid() -> Vec<Vec<f64>> {
    vec![
        vec![0.236],
        vec![0.382],
        vec![0.618],
        vec![0.236, 0.382],
        vec![0.382, 0.618],
        vec![0.236, 0.382, 0.618],
        vec![0.382, 0.5, 0.618],
        vec![0.236, 0.382, 0.5, 0.618, 0.786],
    ]
}

/// One grid cell: the entry levels tried and the resulting metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub levels: Vec<f64>,
    pub metrics: Metrics,
}

/// Run `base` once per level set, varying only `entry_levels`.
pub fn grid_search_retracement(
    base: &Retracement,
    grid: &[Vec<f64>],
    bars: &[Bar],
    settings: &RunSettings,
) -> Result<Vec<GridPoint>, RunError> {
    let points = grid
        .par_iter()
        .map(|levels| {
            let strategy = Retracement {
                entry_levels: levels.clone(),
                ..base.clone()
            };
            run_strategy(&strategy, bars, settings).map(|report| GridPoint {
                levels: levels.clone(),
                metrics: report.metrics,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(points = points.len(), "grid search complete");
    Ok(points)
}

/// Highest Sharpe; earlier points win ties.
pub fn best_by_sharpe(points: &[GridPoint]) -> Option<&GridPoint> {
    points.iter().fold(None, |best: Option<&GridPoint>, p| match best {
        Some(b) if b.metrics.sharpe_ratio >= p.metrics.sharpe_ratio => Some(b),
        _ => Some(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(levels: &[f64], sharpe: f64) -> GridPoint {
        GridPoint {
            levels: levels.to_vec(),
            metrics: Metrics {
                sharpe_ratio: sharpe,
                ..Metrics::default()
            },
        }
    }

    #[test]
    fn default_grid_has_eight_sets() {
        let grid = default_level_grid();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[6], vec![0.382, 0.5, 0.618]);
        assert!(grid.iter().all(|set| set.windows(2).all(|w| w[0] < w[1])));
    }

    #[test]
    fn best_prefers_first_on_tie() {
        let points = vec![point(&[0.236], 0.5), point(&[0.382], 1.2), point(&[0.618], 1.2)];
        assert_eq!(best_by_sharpe(&points).unwrap().levels, vec![0.382]);
        assert!(best_by_sharpe(&[]).is_none());
    }
}
