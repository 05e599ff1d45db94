use crate::domain::order::{OrderId, OrderSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill record, produced by the broker when an order reaches `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price: f64,
    pub size: f64,
    /// Gross notional (`price * size` for unit-sized orders, the submitted
    /// notional for cash-sized buys).
    pub value: f64,
    pub commission: f64,
}
