//! SignalBar — the fundamental market data unit, with per-bar signals attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for the traded instrument, augmented with the four signal
/// columns the strategy reads.
///
/// `exit_price` is the stop level for a long position; it is the only use
/// the broker honors for that column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalBar {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub entry_sig: bool,
    pub entry_price: f64,
    pub exit_sig: bool,
    pub exit_price: f64,
}

impl SignalBar {
    /// Returns true if any numeric field is NaN or infinite (missing cell).
    pub fn has_missing_cells(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.entry_price.is_finite()
            && self.exit_price.is_finite())
    }

    /// OHLC sanity check: `low <= open,close <= high`, prices positive,
    /// volume and signal prices non-negative.
    ///
    /// `exit_price` is NOT required to lie inside the bar's range; a stop
    /// level above the high or below the low is valid input.
    pub fn is_sane(&self) -> bool {
        if self.has_missing_cells() {
            return false;
        }
        self.high >= self.low
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
            && self.open > 0.0
            && self.close > 0.0
            && self.low > 0.0
            && self.volume >= 0.0
            && self.entry_price >= 0.0
            && self.exit_price >= 0.0
    }
}
