//! Strategy state machine — translates per-bar signals into orders and
//! manages the protective stop while a position is open.
//!
//! The strategy never touches cash or position directly; it reads broker
//! state and submits or cancels orders through the broker's public
//! contract, holding order ids (never order references) for its two slots.
//!
//! Entries are single-position: an entry is submitted only from the Flat
//! state, so the strategy never adds to an existing position.

use tracing::{debug, warn};

use crate::broker::{Broker, OrderEvent, OrderRequest, Slot};
use crate::domain::{OrderId, OrderSide, OrderStatus, SignalBar, TradeAction, TradeRecord};
use crate::engine::BacktestConfig;

/// Consecutive failed stop replacements before a warning is surfaced in the
/// run result.
const STOP_FAILURE_WARN_AFTER: u32 = 3;

/// Position lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// No position, no resting orders.
    Flat,
    /// A buy order is live; no position yet.
    EntryPending,
    /// Position open, protective stop live or being (re)placed.
    Long,
    /// Position open, a market exit has been submitted and is not yet
    /// filled.
    Exiting,
}

#[derive(Debug)]
pub struct SignalStrategy {
    risk_percent: f64,
    max_position_size: f64,
    min_size: f64,
    stop_epsilon: f64,

    state: StrategyState,
    entry_order: Option<OrderId>,
    /// Live order in the position-closing slot: the protective stop while
    /// Long, the market exit while Exiting.
    stop_order: Option<OrderId>,
    last_buy_price: Option<f64>,

    trades: Vec<TradeRecord>,
    winning_trades: usize,
    losing_trades: usize,

    /// Consecutive bars on which the stop could not be (re)placed.
    stop_failures: u32,
    warnings: Vec<String>,
}

impl SignalStrategy {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            risk_percent: config.risk_percent,
            max_position_size: config.max_position_size,
            min_size: config.min_size,
            stop_epsilon: config.stop_epsilon,
            state: StrategyState::Flat,
            entry_order: None,
            stop_order: None,
            last_buy_price: None,
            trades: Vec::new(),
            winning_trades: 0,
            losing_trades: 0,
            stop_failures: 0,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    pub fn winning_trades(&self) -> usize {
        self.winning_trades
    }

    pub fn losing_trades(&self) -> usize {
        self.losing_trades
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn live_stop_id(&self) -> Option<OrderId> {
        self.stop_order
    }

    /// Handle a terminal order transition delivered after the broker step.
    pub fn on_order_event(
        &mut self,
        event: &OrderEvent,
        bar: &SignalBar,
        broker: &mut Broker,
        bar_index: usize,
    ) {
        match event.status {
            OrderStatus::Completed => {
                let fill = event.fill.expect("completed orders carry a fill");
                match fill.side {
                    OrderSide::Buy => self.on_buy_fill(event, bar, broker, bar_index),
                    OrderSide::Sell => self.on_sell_fill(event),
                }
            }
            OrderStatus::Canceled | OrderStatus::Margin | OrderStatus::Rejected => {
                // Clear the matching slot only; position is untouched. A
                // stale id (already replaced) is ignored.
                match event.slot {
                    Slot::Entry => {
                        if self.entry_order == Some(event.order_id) {
                            self.entry_order = None;
                            if self.state == StrategyState::EntryPending {
                                self.state = StrategyState::Flat;
                            }
                        }
                    }
                    Slot::Stop => {
                        if self.stop_order == Some(event.order_id) {
                            self.stop_order = None;
                        }
                    }
                }
            }
            OrderStatus::Submitted | OrderStatus::Accepted => {
                debug_assert!(false, "non-terminal status in order event");
            }
        }
    }

    fn on_buy_fill(
        &mut self,
        event: &OrderEvent,
        bar: &SignalBar,
        broker: &mut Broker,
        bar_index: usize,
    ) {
        let fill = event.fill.expect("completed orders carry a fill");
        if self.entry_order == Some(event.order_id) {
            self.entry_order = None;
        }
        self.last_buy_price = Some(fill.price);
        self.trades.push(TradeRecord {
            timestamp: fill.timestamp,
            action: TradeAction::Buy,
            price: fill.price,
            size: fill.size,
            value: fill.value,
            commission: fill.commission,
            pnl: 0.0,
            order_id: fill.order_id,
        });
        self.state = StrategyState::Long;

        // Initial protective stop against the current bar's stop level.
        self.place_stop(bar.exit_price, broker, bar_index);
    }

    fn on_sell_fill(&mut self, event: &OrderEvent) {
        let fill = event.fill.expect("completed orders carry a fill");
        let entry_price = self.last_buy_price.unwrap_or(fill.price);
        let pnl = (fill.price - entry_price) * fill.size;
        self.trades.push(TradeRecord {
            timestamp: fill.timestamp,
            action: TradeAction::Sell,
            price: fill.price,
            size: fill.size,
            value: fill.value,
            commission: fill.commission,
            pnl,
            order_id: fill.order_id,
        });
        if pnl > 0.0 {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }

        if self.stop_order == Some(event.order_id) {
            self.stop_order = None;
        }
        self.last_buy_price = None;
        self.state = StrategyState::Flat;
    }

    /// Act on the current bar's signals. Runs after all of this bar's fills
    /// have been delivered.
    pub fn on_bar(&mut self, bar: &SignalBar, broker: &mut Broker, bar_index: usize) {
        self.entry_gate(bar, broker, bar_index);

        if self.state == StrategyState::Long && broker.position().is_long() {
            if bar.exit_sig {
                self.begin_market_exit(broker, bar_index);
            } else {
                self.manage_stop(bar.exit_price, broker, bar_index);
            }
        }
    }

    /// Submit a market buy when the entry signal is set and nothing is
    /// pending. Sizing commits `risk_percent` of portfolio value, capped by
    /// `max_position_size`, as a cash notional resolved at the fill price.
    fn entry_gate(&mut self, bar: &SignalBar, broker: &mut Broker, bar_index: usize) {
        if !bar.entry_sig || self.state != StrategyState::Flat || self.entry_order.is_some() {
            return;
        }

        let value = broker.portfolio_value(bar.close);
        let long_value = broker.position().market_value(bar.close);
        let notional =
            (value * self.risk_percent / 100.0).min(value * self.max_position_size - long_value);
        let target_units = notional / bar.close;
        if target_units <= self.min_size {
            debug!(target_units, "entry skipped: below minimum size");
            return;
        }

        match broker.submit(OrderRequest::market_buy(notional), bar_index) {
            Ok(id) => {
                self.entry_order = Some(id);
                self.state = StrategyState::EntryPending;
            }
            Err(err) => warn!(%err, "entry submission failed"),
        }
    }

    /// Keep the protective stop aligned with the bar's stop level. A live
    /// stop within `stop_epsilon` of the target is left alone; otherwise it
    /// is cancelled and re-placed. The cancel must be acknowledged before
    /// the replacement is submitted, so a failed cancel leaves the previous
    /// stop live and the whole attempt is retried on the next bar.
    fn manage_stop(&mut self, target: f64, broker: &mut Broker, bar_index: usize) {
        let live_trigger = self
            .stop_order
            .filter(|&id| broker.is_live(id))
            .and_then(|id| broker.order(id).and_then(|o| o.trigger_price()));

        match live_trigger {
            None => {
                self.place_stop(target, broker, bar_index);
            }
            Some(current) => {
                if (current - target).abs() > self.stop_epsilon {
                    let old_id = self.stop_order.expect("live trigger implies a stop id");
                    match broker.cancel(old_id) {
                        Ok(()) => {
                            self.stop_order = None;
                            self.place_stop(target, broker, bar_index);
                        }
                        Err(err) => {
                            warn!(%err, "stop cancel failed; previous stop left in place");
                            self.note_stop_failure();
                        }
                    }
                }
            }
        }
    }

    fn place_stop(&mut self, trigger: f64, broker: &mut Broker, bar_index: usize) {
        let units = broker.position().size;
        if units <= 0.0 {
            return;
        }
        match broker.submit(OrderRequest::stop_sell(trigger, units), bar_index) {
            Ok(id) => {
                self.stop_order = Some(id);
                self.stop_failures = 0;
            }
            Err(err) => {
                warn!(%err, "stop submission failed; retrying next bar");
                self.note_stop_failure();
            }
        }
    }

    /// Exit signal: cancel the protective stop and sell the full position
    /// at the next open.
    fn begin_market_exit(&mut self, broker: &mut Broker, bar_index: usize) {
        if let Some(id) = self.stop_order {
            match broker.cancel(id) {
                Ok(()) => self.stop_order = None,
                Err(err) => {
                    warn!(%err, "stop cancel failed; exit deferred to next bar");
                    self.note_stop_failure();
                    return;
                }
            }
        }
        let units = broker.position().size;
        match broker.submit(OrderRequest::market_sell(units), bar_index) {
            Ok(id) => {
                self.stop_order = Some(id);
                self.state = StrategyState::Exiting;
            }
            Err(err) => warn!(%err, "exit submission failed; retrying next bar"),
        }
    }

    fn note_stop_failure(&mut self) {
        self.stop_failures += 1;
        if self.stop_failures == STOP_FAILURE_WARN_AFTER {
            let warning = format!(
                "stop replacement failed on {STOP_FAILURE_WARN_AFTER} consecutive bars; position may be unprotected"
            );
            warn!("{warning}");
            self.warnings.push(warning);
        }
    }
}
