//! Risk manager: turns a signal plus portfolio exposure into a
//! capital-bounded order.
//!
//! Rejections are ordinary values ([`RiskVerdict::Rejected`]), not errors;
//! the engine records them and moves on. [`RiskError`] is reserved for
//! malformed sizing inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PortfolioState, Signal};

/// One step of the confidence → capital-fraction function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeTier {
    pub min_confidence: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Cap on the fraction of available capital committed to one trade.
    pub max_position_fraction: f64,
    /// Max loss-to-stop as a fraction of equity.
    pub max_portfolio_risk: f64,
    pub min_risk_reward: f64,
    pub max_positions: usize,
    pub default_stop_pct: f64,
    /// Recent-low stop sits this fraction below the low.
    pub stop_buffer: f64,
    /// Bars of history required (and scanned) for the recent-low stop.
    pub stop_lookback: usize,
    /// Checked in order; the first tier whose threshold is met wins.
    pub size_tiers: Vec<SizeTier>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.618,
            max_portfolio_risk: 0.236,
            min_risk_reward: 1.618,
            max_positions: 5,
            default_stop_pct: 0.05,
            stop_buffer: 0.02,
            stop_lookback: 20,
            size_tiers: vec![
                SizeTier {
                    min_confidence: 0.9,
                    fraction: 0.618,
                },
                SizeTier {
                    min_confidence: 0.7,
                    fraction: 0.382,
                },
                SizeTier {
                    min_confidence: 0.5,
                    fraction: 0.236,
                },
                SizeTier {
                    min_confidence: 0.0,
                    fraction: 0.146,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Why a signal was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    TooManyPositions { open: usize, max: usize },
    RiskCeiling { risk: f64, max: f64 },
    RiskReward { ratio: f64, min: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooManyPositions { open, max } => {
                write!(f, "{open} open positions (max {max})")
            }
            RejectReason::RiskCeiling { risk, max } => {
                write!(f, "trade risk {:.2}% exceeds {:.2}%", risk * 100.0, max * 100.0)
            }
            RejectReason::RiskReward { ratio, min } => {
                write!(f, "risk/reward {ratio:.2} below {min:.2}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskVerdict {
    Approved,
    Rejected(RejectReason),
}

/// The slice of portfolio state the risk manager needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    pub cash: f64,
    pub open_notional: f64,
    pub equity: f64,
    pub open_positions: usize,
}

impl Exposure {
    /// Exposure with open positions marked at `price`.
    pub fn of(portfolio: &PortfolioState, price: f64) -> Self {
        Self {
            cash: portfolio.cash,
            open_notional: portfolio.open_notional(),
            equity: portfolio.equity(price),
            open_positions: portfolio.open_count(),
        }
    }

    /// `equity - open notional`, floored at zero.
    ///
    /// Cash is already net of every entry's notional, so this is cash plus
    /// unrealized P&L on the open book.
    pub fn available_capital(&self) -> f64 {
        (self.equity - self.open_notional).max(0.0)
    }
}

/// Fill price and protective levels for a proposed entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryLevels {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Fraction of available capital for a confidence level.
    pub fn size_fraction(&self, confidence: f64) -> f64 {
        let tier = self
            .config
            .size_tiers
            .iter()
            .find(|t| confidence >= t.min_confidence)
            .map_or(0.0, |t| t.fraction);
        tier.min(self.config.max_position_fraction)
    }

    /// Share count for an entry at `entry_price` with a stop at `stop_loss`.
    ///
    /// Capital committed is `available × size_fraction(confidence)`, then
    /// capped so `(entry - stop) × shares <= max_portfolio_risk × equity`.
    pub fn size(
        &self,
        signal: &Signal,
        exposure: &Exposure,
        entry_price: f64,
        stop_loss: f64,
    ) -> Result<f64, RiskError> {
        check_input("entry_price", entry_price)?;
        check_input("stop_loss", stop_loss)?;
        check_input("cash", exposure.cash)?;
        check_input("equity", exposure.equity)?;
        if entry_price == 0.0 {
            return Ok(0.0);
        }

        let committed = exposure.available_capital() * self.size_fraction(signal.confidence);
        let mut shares = committed / entry_price;

        let risk_per_share = entry_price - stop_loss;
        if risk_per_share > 0.0 {
            let max_shares = self.config.max_portfolio_risk * exposure.equity / risk_per_share;
            shares = shares.min(max_shares);
        }
        Ok(shares.max(0.0))
    }

    /// The signal's stop if present, else the lower of the default percentage
    /// stop and a buffered recent low.
    pub fn stop_loss(&self, entry_price: f64, signal: &Signal, recent_low: Option<f64>) -> f64 {
        if let Some(stop) = signal.stop_loss {
            return stop;
        }
        let default_stop = entry_price * (1.0 - self.config.default_stop_pct);
        match recent_low {
            Some(low) => default_stop.min(low * (1.0 - self.config.stop_buffer)),
            None => default_stop,
        }
    }

    pub fn take_profit(&self, entry_price: f64, stop_loss: f64, reward_ratio: f64) -> f64 {
        entry_price + reward_ratio * (entry_price - stop_loss)
    }

    /// The signal's target if present, else `take_profit` at the minimum
    /// acceptable risk/reward.
    pub fn resolve_take_profit(&self, entry_price: f64, stop_loss: f64, signal: &Signal) -> f64 {
        signal
            .take_profit
            .unwrap_or_else(|| self.take_profit(entry_price, stop_loss, self.config.min_risk_reward))
    }

    /// Stop and target for an entry filled at `entry_price`.
    pub fn entry_levels(
        &self,
        entry_price: f64,
        signal: &Signal,
        recent_low: Option<f64>,
    ) -> EntryLevels {
        let stop_loss = self.stop_loss(entry_price, signal, recent_low);
        EntryLevels {
            entry_price,
            stop_loss,
            take_profit: self.resolve_take_profit(entry_price, stop_loss, signal),
        }
    }

    /// Checked in order: position cap, risk ceiling, risk/reward.
    ///
    /// `levels` are the fill price and protective levels the order will
    /// carry. Risk/reward is only checked against a target the signal set
    /// itself; a derived target sits at the minimum by construction.
    pub fn validate(
        &self,
        signal: &Signal,
        exposure: &Exposure,
        levels: &EntryLevels,
    ) -> RiskVerdict {
        let cfg = &self.config;
        if exposure.open_positions >= cfg.max_positions {
            return RiskVerdict::Rejected(RejectReason::TooManyPositions {
                open: exposure.open_positions,
                max: cfg.max_positions,
            });
        }

        let EntryLevels {
            entry_price: price,
            stop_loss: stop,
            take_profit: target,
        } = *levels;

        if price > 0.0 {
            let risk = signal.size_hint * (price - stop) / price;
            if risk > cfg.max_portfolio_risk {
                return RiskVerdict::Rejected(RejectReason::RiskCeiling {
                    risk,
                    max: cfg.max_portfolio_risk,
                });
            }
        }

        if signal.take_profit.is_some() {
            let ratio = risk_reward(price, stop, target);
            if ratio < cfg.min_risk_reward {
                return RiskVerdict::Rejected(RejectReason::RiskReward {
                    ratio,
                    min: cfg.min_risk_reward,
                });
            }
        }

        RiskVerdict::Approved
    }
}

/// `(target - entry) / (entry - stop)`; 0 when the stop is not below entry.
pub fn risk_reward(entry: f64, stop: f64, target: f64) -> f64 {
    let risk = entry - stop;
    if risk <= 0.0 {
        return 0.0;
    }
    (target - entry) / risk
}

fn check_input(field: &'static str, value: f64) -> Result<(), RiskError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RiskError::InvalidInput { field, value });
    }
    Ok(())
}
