//! Bar series sources: CSV ingest and seeded synthetic generation.

pub mod csv;
pub mod synthetic;

pub use self::csv::{read_bars, read_bars_from_path, REQUIRED_COLUMNS};
pub use synthetic::{generate, SyntheticConfig};

use crate::domain::BarError;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row}: unparseable timestamp {value:?}")]
    Timestamp { row: usize, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bar(#[from] BarError),
}
