//! Fibolab Core: level encoder, strategies, risk manager, simulation loop.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, signals, positions, closed trades, portfolio state)
//! - Integer-exact Fibonacci/Lucas level encoder and Zeckendorf compressor
//! - Indicators precomputed once per run
//! - Strategy trait with retracement, momentum, mean-reversion, breakout, and
//!   Lucas time-exit variants
//! - Risk manager: confidence-tiered sizing, protective levels, trade validation
//! - Bar-by-bar simulation engine with a cash-conservation invariant
//! - CSV ingest and seeded synthetic series

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod levels;
pub mod risk;
pub mod rng;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across parallel runs is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();
        require_send::<domain::PortfolioState>();
        require_sync::<domain::PortfolioState>();

        require_send::<levels::LevelEncoder>();
        require_sync::<levels::LevelEncoder>();
        require_send::<indicators::IndicatorValues>();
        require_sync::<indicators::IndicatorValues>();

        require_send::<risk::RiskManager>();
        require_sync::<risk::RiskManager>();
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::SimulationEngine<'static>>();
        require_sync::<engine::SimulationEngine<'static>>();

        require_send::<Box<dyn strategy::Strategy>>();
        require_sync::<Box<dyn strategy::Strategy>>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }

    /// Strategies see bars and precomputed indicators, never portfolio state.
    #[test]
    fn strategy_trait_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            s: &dyn strategy::Strategy,
            bars: &[domain::Bar],
            indicators: &indicators::IndicatorValues,
        ) -> domain::Signal {
            s.evaluate(bars, 0, indicators)
        }
    }

    /// The shared encoder is one instance per process.
    #[test]
    fn shared_encoder_is_a_singleton() {
        let a = levels::LevelEncoder::shared() as *const _;
        let b = levels::LevelEncoder::shared() as *const _;
        assert_eq!(a, b);
    }
}
