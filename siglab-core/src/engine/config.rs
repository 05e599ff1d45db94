//! Backtest configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable configuration for a single backtest run.
///
/// Missing fields deserialize to the documented defaults, so a TOML config
/// only needs to name the options it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    /// Starting cash balance.
    pub initial_cash: f64,
    /// Fraction of gross notional charged per fill.
    pub commission: f64,
    /// Per-entry notional as a percentage of portfolio value, in (0, 100].
    pub risk_percent: f64,
    /// Cap on long exposure as a fraction of portfolio value, in (0, 1].
    pub max_position_size: f64,
    /// Minimum tradable unit.
    pub min_size: f64,
    /// Price delta below which a live stop is left in place rather than
    /// cancelled and re-placed.
    pub stop_epsilon: f64,
    /// Periods per year for the Sharpe-like ratio.
    pub annualization_factor: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission: 0.001,
            risk_percent: 2.0,
            max_position_size: 0.5,
            min_size: 0.001,
            stop_epsilon: 0.01,
            annualization_factor: 252.0,
        }
    }
}

impl BacktestConfig {
    /// Validate option ranges. Called before the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::InitialCash(self.initial_cash));
        }
        if !(self.commission.is_finite() && self.commission >= 0.0) {
            return Err(ConfigError::Commission(self.commission));
        }
        if !(self.risk_percent.is_finite() && self.risk_percent > 0.0 && self.risk_percent <= 100.0)
        {
            return Err(ConfigError::RiskPercent(self.risk_percent));
        }
        if !(self.max_position_size.is_finite()
            && self.max_position_size > 0.0
            && self.max_position_size <= 1.0)
        {
            return Err(ConfigError::MaxPositionSize(self.max_position_size));
        }
        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return Err(ConfigError::MinSize(self.min_size));
        }
        if !(self.stop_epsilon.is_finite() && self.stop_epsilon >= 0.0) {
            return Err(ConfigError::StopEpsilon(self.stop_epsilon));
        }
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            return Err(ConfigError::AnnualizationFactor(self.annualization_factor));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial_cash must be positive, got {0}")]
    InitialCash(f64),

    #[error("commission must be non-negative, got {0}")]
    Commission(f64),

    #[error("risk_percent must be in (0, 100], got {0}")]
    RiskPercent(f64),

    #[error("max_position_size must be in (0, 1], got {0}")]
    MaxPositionSize(f64),

    #[error("min_size must be positive, got {0}")]
    MinSize(f64),

    #[error("stop_epsilon must be non-negative, got {0}")]
    StopEpsilon(f64),

    #[error("annualization_factor must be positive, got {0}")]
    AnnualizationFactor(f64),
}
