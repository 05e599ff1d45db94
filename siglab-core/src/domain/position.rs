use serde::{Deserialize, Serialize};

/// The engine's current long holding of the single instrument, or flat.
/// Short positions are not representable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub size: f64,
    pub avg_entry_price: f64,
    /// Most recent buy fill price, used for P&L attribution on the
    /// subsequent sell.
    pub last_buy_price: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            size: 0.0,
            avg_entry_price: 0.0,
            last_buy_price: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    pub fn is_long(&self) -> bool {
        self.size > 0.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }

    /// Record a buy fill: grow the position and update the average entry.
    pub fn add(&mut self, size: f64, price: f64) {
        let total_cost = self.avg_entry_price * self.size + price * size;
        self.size += size;
        self.avg_entry_price = if self.size > 0.0 {
            total_cost / self.size
        } else {
            0.0
        };
        self.last_buy_price = price;
    }

    /// Record a sell fill: shrink the position, flattening entirely when the
    /// full size is sold.
    pub fn reduce(&mut self, size: f64) {
        self.size -= size;
        if self.size <= 0.0 {
            *self = Self::flat();
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}
