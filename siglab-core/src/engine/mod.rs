//! Backtesting engine — configuration, the bar-by-bar loop, and the run
//! result.
//!
//! The loop is strictly single-threaded and sequential. Per bar:
//!
//! 1. The broker resolves resting orders (stops before markets).
//! 2. Each terminal order transition is delivered to the strategy.
//! 3. The strategy acts on the current bar's signals.
//! 4. An equity sample is appended.
//!
//! Given identical bars and configuration, two runs produce byte-identical
//! trade logs and equity curves.

pub mod config;
pub mod result;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use result::RunResult;
pub use runner::run_backtest;

use thiserror::Error;

use crate::data::DataError;

/// Structural run failures. Recoverable per-bar events (order rejections)
/// are logged and swallowed; these abort the run with no partial results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
