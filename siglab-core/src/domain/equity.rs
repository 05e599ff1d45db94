use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Equity sample, captured exactly once per bar after all fills.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    /// Position mark-to-market at the bar's close.
    pub position_value: f64,
    /// `cash + position_value`.
    pub total: f64,
}
