//! Result of a complete backtest run.

use serde::{Deserialize, Serialize};

use crate::analyzers::Summary;
use crate::domain::{EquitySample, Order, TradeRecord};

/// Everything the engine emits on completion. Persistence and rendering
/// are collaborator responsibilities; no storage backend is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Ordered trade log, one record per completed fill.
    pub trades: Vec<TradeRecord>,
    /// Full order history in submission order, live and terminal.
    pub orders: Vec<Order>,
    /// One equity sample per bar, in bar order.
    pub equity_curve: Vec<EquitySample>,
    /// Aggregate performance metrics.
    pub summary: Summary,
    /// Non-fatal run warnings (e.g. repeated stop-replacement failure).
    pub warnings: Vec<String>,
    /// Deterministic hash of configuration and input data.
    pub fingerprint: String,
}
