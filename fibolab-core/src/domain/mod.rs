//! Domain types for fibolab

pub mod bar;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{validate_series, Bar, BarError};
pub use portfolio::PortfolioState;
pub use position::Position;
pub use signal::{Diagnostics, LevelTag, Signal, SignalKind};
pub use trade::{ClosedTrade, ExitReason};
