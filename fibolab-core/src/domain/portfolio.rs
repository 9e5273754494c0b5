//! PortfolioState: cash, open positions, and the equity curve.

use super::position::Position;

/// Aggregate portfolio state, owned by a single engine run.
///
/// The accounting identity `cash + Σ(shares × close) == equity_curve.last()`
/// holds after every bar.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    pub cash: f64,
    pub positions: Vec<Position>,
    /// Starts with the initial capital; one entry is appended per bar.
    pub equity_curve: Vec<f64>,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            positions: Vec::new(),
            equity_curve: vec![initial_capital],
        }
    }

    /// Σ(entry price × shares) over open positions.
    pub fn open_notional(&self) -> f64 {
        self.positions.iter().map(Position::notional).sum()
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.positions.iter().map(|p| p.market_value(price)).sum()
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Most recent equity point.
    pub fn last_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(self.cash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn position(entry_price: f64, shares: f64) -> Position {
        Position {
            entry_index: 0,
            entry_time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            entry_price,
            shares,
            stop_loss: entry_price * 0.95,
            take_profit: entry_price * 1.1,
            entry_commission: 0.0,
            max_hold_bars: None,
        }
    }

    #[test]
    fn new_portfolio_seeds_equity_curve() {
        let p = PortfolioState::new(100_000.0);
        assert_eq!(p.cash, 100_000.0);
        assert_eq!(p.equity_curve, vec![100_000.0]);
        assert_eq!(p.last_equity(), 100_000.0);
        assert_eq!(p.open_count(), 0);
    }

    #[test]
    fn equity_marks_positions_at_price() {
        let mut p = PortfolioState::new(10_000.0);
        p.cash = 5_000.0;
        p.positions.push(position(100.0, 30.0));
        p.positions.push(position(50.0, 40.0));
        assert_eq!(p.open_notional(), 5_000.0);
        assert_eq!(p.market_value(110.0), 7_700.0);
        assert_eq!(p.equity(110.0), 12_700.0);
    }
}
