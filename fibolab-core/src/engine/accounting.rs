//! Fill accounting: cash and position mutations for entries and exits.
//!
//! Every function here keeps `cash + Σ(shares × price)` consistent with the
//! money that actually moved, commissions included.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{ClosedTrade, ExitReason, Position};

use super::state::{EngineConfig, EngineState};

/// A sized entry, before affordability checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryOrder {
    pub bar_index: usize,
    pub time: NaiveDateTime,
    /// Slippage-adjusted fill price.
    pub price: f64,
    pub shares: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub max_hold_bars: Option<usize>,
}

/// Fit `order` to available cash and open it.
///
/// Orders that cost more than cash shrink to `cash / (1 + commission) × buffer`.
/// Orders whose final notional is below `min_notional` are dropped and `false`
/// is returned.
pub fn open_position(state: &mut EngineState, config: &EngineConfig, order: EntryOrder) -> bool {
    let cash = state.portfolio.cash;
    let mut notional = order.shares * order.price;
    if notional * (1.0 + config.commission) > cash {
        notional = (cash / (1.0 + config.commission)) * config.cash_buffer;
    }
    if !(notional >= config.min_notional) || order.price <= 0.0 {
        state.dropped_orders += 1;
        debug!(
            bar = order.bar_index,
            notional, "order below minimum notional dropped"
        );
        return false;
    }

    let commission = notional * config.commission;
    let position = Position {
        entry_index: order.bar_index,
        entry_time: order.time,
        entry_price: order.price,
        shares: notional / order.price,
        stop_loss: order.stop_loss,
        take_profit: order.take_profit,
        entry_commission: commission,
        max_hold_bars: order.max_hold_bars,
    };
    state.portfolio.cash -= notional + commission;
    debug!(
        bar = order.bar_index,
        price = order.price,
        shares = position.shares,
        stop = position.stop_loss,
        target = position.take_profit,
        "opened position"
    );
    state.portfolio.positions.push(position);
    true
}

/// Close `position` at `price`, crediting proceeds net of `commission_rate`.
pub fn close_position(
    state: &mut EngineState,
    position: Position,
    bar_index: usize,
    time: NaiveDateTime,
    price: f64,
    commission_rate: f64,
    reason: ExitReason,
) {
    let proceeds = position.shares * price;
    let commission = proceeds * commission_rate;
    state.portfolio.cash += proceeds - commission;
    let trade = ClosedTrade::from_position(&position, bar_index, time, price, commission, reason);
    debug!(
        bar = bar_index,
        price,
        pnl = trade.pnl,
        reason = reason.as_str(),
        "closed position"
    );
    state.trades.push(trade);
}

/// Close every open position at the same price.
pub fn close_all(
    state: &mut EngineState,
    bar_index: usize,
    time: NaiveDateTime,
    price: f64,
    commission_rate: f64,
    reason: ExitReason,
) {
    let positions = std::mem::take(&mut state.portfolio.positions);
    for position in positions {
        close_position(state, position, bar_index, time, price, commission_rate, reason);
    }
}
