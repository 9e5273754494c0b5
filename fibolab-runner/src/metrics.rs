//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar
//! out. Numeric edges return sentinels (0.0, or +∞ for a profit factor with no
//! losses) instead of NaN.

use serde::{Deserialize, Serialize};

use fibolab_core::domain::ClosedTrade;
use fibolab_core::levels::zeckendorf;

/// Scale applied before Zeckendorf-encoding fractional metrics.
pub const ENCODING_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate, de-annualized per bar.
    pub risk_free_rate: f64,
    pub periods_per_year: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252,
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fractional return over the curve: final / initial - 1.
    pub total_return: f64,
    pub total_pnl: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    /// Longest run of consecutive bars below the running peak.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    /// `+inf` with winners and no losers; serialized as the string "inf".
    #[serde(with = "unbounded_ratio")]
    pub profit_factor: f64,
    pub expectancy: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    /// Zeckendorf indices of `floor(sharpe × 1000)`; empty unless Sharpe > 0.
    pub encoded_sharpe: Vec<usize>,
    /// Zeckendorf indices of `floor(|max_drawdown| × 1000)`.
    pub encoded_max_drawdown: Vec<usize>,
}

/// Reduces an equity curve and trade ledger to [`Metrics`].
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    config: MetricsConfig,
}

impl PerformanceAnalyzer {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn summarize(&self, equity_curve: &[f64], trades: &[ClosedTrade]) -> Metrics {
        let rf = self.config.risk_free_rate;
        let ppy = self.config.periods_per_year;
        let returns = bar_returns(equity_curve);
        let (max_dd, dd_duration) = max_drawdown(equity_curve);
        let sharpe = sharpe_ratio(&returns, rf, ppy);

        let winners: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
        let losers: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();

        Metrics {
            total_return: total_return(equity_curve),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            sharpe_ratio: sharpe,
            sortino_ratio: sortino_ratio(&returns, rf, ppy),
            calmar_ratio: calmar_ratio(&returns, max_dd, ppy),
            max_drawdown: max_dd,
            max_drawdown_duration: dd_duration,
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            expectancy: expectancy(trades),
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            avg_win: mean_or_zero(&winners),
            avg_loss: mean_or_zero(&losers),
            largest_win: winners.iter().copied().fold(0.0, f64::max),
            largest_loss: losers.iter().copied().fold(0.0, f64::min),
            avg_bars_held: mean_or_zero(
                &trades.iter().map(|t| t.bars_held() as f64).collect::<Vec<_>>(),
            ),
            encoded_sharpe: encode_scaled(sharpe),
            encoded_max_drawdown: encode_scaled(max_dd.abs()),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Simple per-bar returns. Bars after a non-positive equity contribute 0.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}

/// Annualized Sharpe: mean(returns - rf/ppy) / std(returns) × √ppy.
///
/// 0.0 for fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: usize) -> f64 {
    let sd = sample_std(returns);
    if returns.len() < 2 || sd < 1e-15 {
        return 0.0;
    }
    let ppy = periods_per_year as f64;
    let excess = mean_or_zero(returns) - risk_free_rate / ppy;
    excess / sd * ppy.sqrt()
}

/// Annualized Sortino: like Sharpe, but divided by the standard deviation of
/// the negative returns only.
///
/// 0.0 when there are fewer than two losing bars or they have zero spread.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: usize) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_sd = sample_std(&downside);
    if downside.len() < 2 || downside_sd < 1e-15 {
        return 0.0;
    }
    let ppy = periods_per_year as f64;
    let excess = mean_or_zero(returns) - risk_free_rate / ppy;
    excess / downside_sd * ppy.sqrt()
}

/// Annualized mean return over |max drawdown|; 0.0 without a drawdown.
pub fn calmar_ratio(returns: &[f64], max_drawdown: f64, periods_per_year: usize) -> f64 {
    if max_drawdown >= 0.0 {
        return 0.0;
    }
    mean_or_zero(returns) * periods_per_year as f64 / max_drawdown.abs()
}

/// Deepest `(equity - running_max) / running_max` and the longest run of
/// consecutive bars spent below the running max.
pub fn max_drawdown(equity_curve: &[f64]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    let (mut run, mut longest) = (0usize, 0usize);

    for &equity in equity_curve {
        peak = peak.max(equity);
        let dd = if peak > 0.0 { (equity - peak) / peak } else { 0.0 };
        worst = worst.min(dd);
        if dd < 0.0 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    (worst, longest)
}

/// Winners / total; 0.0 with no trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / |gross loss|.
///
/// +∞ with profits and no losses; 0.0 with neither.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// `win_rate × avg_win - (1 - win_rate) × |avg_loss|`.
pub fn expectancy(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
    let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();
    let wr = win_rate(trades);
    wr * mean_or_zero(&wins) - (1.0 - wr) * mean_or_zero(&losses).abs()
}

/// Zeckendorf indices of `floor(value × 1000)`; empty for non-positive or
/// non-finite values.
pub fn encode_scaled(value: f64) -> Vec<usize> {
    if !value.is_finite() || value <= 0.0 {
        return Vec::new();
    }
    let scaled = (value * ENCODING_SCALE).floor() as i128;
    zeckendorf::compress(scaled).unwrap_or_default()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// n - 1 denominator; 0.0 below two samples.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_or_zero(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// JSON has no infinity; ratios that may be unbounded go through a string.
mod unbounded_ratio {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(0.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(v) => Ok(v),
            Repr::Text(t) if t == "inf" => Ok(f64::INFINITY),
            Repr::Text(t) => Err(serde::de::Error::custom(format!("invalid ratio '{t}'"))),
        }
    }
}
