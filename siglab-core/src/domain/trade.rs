//! TradeRecord — one completed fill and its realized P&L.

use crate::domain::order::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a completed fill as it appears in the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Append-only trade log entry, written on every completed fill.
///
/// `pnl` is zero on a buy and `(sell_price - last_buy_price) * size` on a
/// sell, gross of commission. The trade log is the authoritative ground
/// truth for the trade-level analyzers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub price: f64,
    pub size: f64,
    /// Gross notional of the fill.
    pub value: f64,
    pub commission: f64,
    pub pnl: f64,
    pub order_id: OrderId,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.action == TradeAction::Sell && self.pnl > 0.0
    }
}
