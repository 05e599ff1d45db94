//! Order types and the order lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, assigned by the broker at submission. The strategy holds ids,
/// never order references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the next bar's open price.
    Market,
    /// Long-side protective stop: triggers when the bar's low reaches the
    /// trigger, then fills as market.
    Stop { trigger_price: f64 },
}

/// How the order's quantity is expressed.
///
/// Market buys carry a cash notional: the broker resolves the executed unit
/// count at the fill price, so an all-in entry fills at `cash / open` units
/// without the strategy looking ahead to the execution bar. Sells and stops
/// always carry fixed units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderSize {
    /// Fixed number of instrument units.
    Units(f64),
    /// Cash notional, resolved to units at the execution price.
    Notional(f64),
}

/// Order lifecycle states. Once terminal, an order is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created by the strategy, not yet acknowledged.
    Submitted,
    /// Acknowledged by the broker, resting in the book.
    Accepted,
    /// Completely filled.
    Completed,
    /// Cancelled before execution.
    Canceled,
    /// Rejected: the fill would have exceeded available cash.
    Margin,
    /// Rejected: sub-minimum size or other broker-internal failure.
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Submitted | OrderStatus::Accepted)
    }
}

/// A single order. Identity is immutable; only the status transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub size: OrderSize,
    pub status: OrderStatus,
    /// Bar index at submission. Orders never execute on their submission
    /// bar; they become eligible at the next broker step.
    pub created_bar: usize,
}

impl Order {
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Trigger price, for stop orders.
    pub fn trigger_price(&self) -> Option<f64> {
        match self.kind {
            OrderKind::Stop { trigger_price } => Some(trigger_price),
            OrderKind::Market => None,
        }
    }
}
