//! Bar-by-bar simulation loop: the heart of the backtesting engine.
//!
//! Phases per bar:
//! 1. EvaluateSignal: ask the strategy for a signal
//! 2. Size/Validate: risk checks and position sizing for Buy signals
//! 3. Fill: open at most one position, or flatten all on Sell
//! 4. CheckProtectiveLevels: stop, then target, then time exit
//! 5. MarkToMarket: append equity, record the audit snapshot

use tracing::{debug, info};

use crate::domain::{validate_series, Bar, ExitReason, Signal, SignalKind};
use crate::indicators::precompute;
use crate::risk::{Exposure, RiskManager, RiskVerdict};
use crate::strategy::{Strategy, TimeExit};

use super::accounting::{close_all, close_position, open_position, EntryOrder};
use super::state::{BarAudit, EngineConfig, EngineError, EngineState, Rejection, RunResult};

/// Runs one strategy over one bar series.
///
/// Each engine owns nothing mutable between runs; `run` builds fresh state,
/// so an engine can be reused or shared across threads.
pub struct SimulationEngine<'a> {
    config: EngineConfig,
    risk: RiskManager,
    strategy: &'a dyn Strategy,
    time_exit: Option<TimeExit>,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(config: EngineConfig, risk: RiskManager, strategy: &'a dyn Strategy) -> Self {
        Self {
            config,
            risk,
            strategy,
            time_exit: None,
        }
    }

    /// Force-close positions held longer than a Lucas holding period.
    pub fn with_time_exit(mut self, time_exit: TimeExit) -> Self {
        self.time_exit = Some(time_exit);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy
    }

    /// Simulate the full series. Fails before touching any state if the
    /// series or config is malformed.
    pub fn run(&self, bars: &[Bar]) -> Result<RunResult, EngineError> {
        self.config.validate()?;
        validate_series(bars)?;

        let indicators = precompute(bars, &self.strategy.indicators());
        let mut state = EngineState::new(self.config.initial_capital);

        for (i, bar) in bars.iter().enumerate() {
            // ─── Phase 1: EvaluateSignal ───
            let signal = self.strategy.evaluate(bars, i, &indicators);
            state.signal_counts.record(signal.kind);

            // ─── Phases 2-3: Size/Validate, Fill ───
            let mut opened = 0;
            match signal.kind {
                SignalKind::Buy => {
                    if self.try_enter(&mut state, bars, i, &signal)? {
                        opened = 1;
                    }
                }
                SignalKind::Sell => {
                    let price = signal.price * (1.0 - self.config.slippage);
                    close_all(
                        &mut state,
                        i,
                        bar.timestamp,
                        price,
                        self.config.commission,
                        ExitReason::Signal,
                    );
                }
                SignalKind::Hold => {}
            }

            // ─── Phase 4: CheckProtectiveLevels ───
            self.check_protective_levels(&mut state, bar, i);

            // ─── Phase 5: MarkToMarket ───
            let equity = state.verify_equity(bar.close);
            state.portfolio.equity_curve.push(equity);
            state.audit.push(BarAudit {
                cash: state.portfolio.cash,
                position_value: state.portfolio.market_value(bar.close),
                open_positions: state.portfolio.open_count(),
                opened,
            });
        }

        // Terminal: liquidate at the final close without friction.
        let (last_index, last) = (bars.len() - 1, &bars[bars.len() - 1]);
        close_all(
            &mut state,
            last_index,
            last.timestamp,
            last.close,
            0.0,
            ExitReason::EndOfData,
        );

        let final_equity = state.portfolio.last_equity();
        info!(
            strategy = self.strategy.name(),
            bars = bars.len(),
            trades = state.trades.len(),
            rejections = state.rejections.len(),
            final_equity,
            "backtest complete"
        );

        Ok(RunResult {
            strategy_name: self.strategy.name().to_string(),
            initial_capital: self.config.initial_capital,
            equity_curve: state.portfolio.equity_curve,
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            trades: state.trades,
            final_equity,
            final_cash: state.portfolio.cash,
            bar_count: bars.len(),
            warmup_bars: self.strategy.warmup_bars(),
            signal_counts: state.signal_counts,
            rejections: state.rejections,
            dropped_orders: state.dropped_orders,
            audit: state.audit,
        })
    }

    /// Validate, size, and fill a Buy. Returns whether a position opened.
    fn try_enter(
        &self,
        state: &mut EngineState,
        bars: &[Bar],
        i: usize,
        signal: &Signal,
    ) -> Result<bool, EngineError> {
        let bar = &bars[i];
        let exposure = Exposure::of(&state.portfolio, bar.close);

        let entry_price = signal.price * (1.0 + self.config.slippage);
        let lookback = self.risk.config().stop_lookback;
        let recent_low = (lookback > 0 && i >= lookback)
            .then(|| bars[i - lookback..i].iter().map(|b| b.low).fold(f64::INFINITY, f64::min));
        let levels = self.risk.entry_levels(entry_price, signal, recent_low);

        if let RiskVerdict::Rejected(reason) = self.risk.validate(signal, &exposure, &levels) {
            debug!(bar = i, %reason, "signal rejected");
            state.rejections.push(Rejection {
                bar_index: i,
                reason,
            });
            return Ok(false);
        }

        let shares = self.risk.size(signal, &exposure, entry_price, levels.stop_loss)?;

        let order = EntryOrder {
            bar_index: i,
            time: bar.timestamp,
            price: entry_price,
            shares,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            max_hold_bars: self
                .time_exit
                .as_ref()
                .map(|t| t.holding_period(bars, i)),
        };
        Ok(open_position(state, &self.config, order))
    }

    /// Stop first, then target, both against the bar's range; then the
    /// holding-period limit at the slippage-adjusted close.
    fn check_protective_levels(&self, state: &mut EngineState, bar: &Bar, i: usize) {
        let positions = std::mem::take(&mut state.portfolio.positions);
        let mut still_open = Vec::with_capacity(positions.len());
        for position in positions {
            let exit = if position.stop_hit(bar.low) {
                Some((position.stop_loss, ExitReason::StopLoss))
            } else if position.target_hit(bar.high) {
                Some((position.take_profit, ExitReason::TakeProfit))
            } else if position
                .max_hold_bars
                .is_some_and(|limit| position.bars_held(i) > limit)
            {
                Some((bar.close * (1.0 - self.config.slippage), ExitReason::TimeExit))
            } else {
                None
            };

            match exit {
                Some((price, reason)) => close_position(
                    state,
                    position,
                    i,
                    bar.timestamp,
                    price,
                    self.config.commission,
                    reason,
                ),
                None => still_open.push(position),
            }
        }
        state.portfolio.positions = still_open;
    }
}
