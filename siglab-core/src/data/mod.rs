//! Data ingestion — CSV loading, bar-level validation, and synthetic
//! series generation.
//!
//! Bars are modeled as fixed records with all fields known at construction.
//! Every row is validated before the simulation loop starts; a malformed
//! input fails the run up front with a structured error and no partial
//! results.

pub mod loader;
pub mod synthetic;

pub use loader::{load_bars_csv, read_bars};
pub use synthetic::{synthetic_bars, SyntheticSeries};

use thiserror::Error;

/// The bad-input error class. All variants are detected before the run
/// starts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read bar data: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable datetime {value:?}")]
    BadDatetime { row: usize, value: String },

    #[error("row {row}: signal column {column} must be 0 or 1, got {value}")]
    BadSignal {
        row: usize,
        column: &'static str,
        value: f64,
    },

    #[error("row {row}: missing or non-finite numeric cell in column {column}")]
    MissingCell { row: usize, column: &'static str },

    #[error("row {row}: malformed bar (negative price or OHLC out of range)")]
    MalformedBar { row: usize },

    #[error("row {row}: timestamp not monotonically increasing")]
    NonMonotonic { row: usize },

    #[error("row {row}: duplicate timestamp")]
    DuplicateTimestamp { row: usize },
}
