//! Broker — cash, position, and order execution against bar prices.
//!
//! The broker is the only writer of cash, position, and order state. Per
//! bar, `step` resolves resting orders in a strict sequence:
//!
//! 1. Stop orders. A long-side stop with trigger `p` fires iff `low <= p`;
//!    execution at `min(open, p)` when the bar gaps through (`open <= p`),
//!    otherwise at `p`.
//! 2. Market orders, always at the bar's open.
//!
//! Orders submitted while processing bar `n` carry `created_bar == n` and
//! become eligible at bar `n + 1`'s step. Fills never split: an order
//! either fills fully or is rejected. Every terminal transition emits an
//! [`OrderEvent`] that the engine delivers to the strategy.

pub mod book;

pub use book::{OrderBook, Slot};

use thiserror::Error;
use tracing::warn;

use crate::domain::{
    Fill, Order, OrderId, OrderKind, OrderSide, OrderSize, OrderStatus, Position, SignalBar,
};
use crate::engine::BacktestConfig;

/// Order-lifecycle misuse. Recoverable at the strategy layer except for
/// [`BrokerError::Oversold`], which the engine treats as fatal.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error("order {0} is not live")]
    NotLive(OrderId),

    #[error("slot already holds live order {0}")]
    SlotOccupied(OrderId),

    #[error("sell of {size} units exceeds open position of {position}")]
    Oversold { size: f64, position: f64 },
}

/// A request to open an order; the broker assigns the id.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub kind: OrderKind,
    pub size: OrderSize,
}

impl OrderRequest {
    pub fn market_buy(notional: f64) -> Self {
        Self {
            side: OrderSide::Buy,
            kind: OrderKind::Market,
            size: OrderSize::Notional(notional),
        }
    }

    pub fn market_sell(units: f64) -> Self {
        Self {
            side: OrderSide::Sell,
            kind: OrderKind::Market,
            size: OrderSize::Units(units),
        }
    }

    pub fn stop_sell(trigger_price: f64, units: f64) -> Self {
        Self {
            side: OrderSide::Sell,
            kind: OrderKind::Stop { trigger_price },
            size: OrderSize::Units(units),
        }
    }
}

/// Notification of a terminal order transition, delivered to the strategy
/// after each broker step. Carries the fill when the order completed.
#[derive(Debug, Clone, Copy)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub slot: Slot,
    pub status: OrderStatus,
    pub fill: Option<Fill>,
}

#[derive(Debug)]
pub struct Broker {
    cash: f64,
    position: Position,
    commission_rate: f64,
    min_size: f64,
    book: OrderBook,
    /// Terminal transitions since the last step (cancellations made during
    /// the strategy phase), delivered with the next step's events.
    pending_events: Vec<OrderEvent>,
}

impl Broker {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            cash: config.initial_cash,
            position: Position::flat(),
            commission_rate: config.commission,
            min_size: config.min_size,
            book: OrderBook::new(),
            pending_events: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Portfolio value at the given mark price.
    pub fn portfolio_value(&self, mark_price: f64) -> f64 {
        self.cash + self.position.market_value(mark_price)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.book.get(id)
    }

    pub fn is_live(&self, id: OrderId) -> bool {
        self.book.is_live(id)
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Accept an order into the book. Assigns the id and transitions the
    /// order to `Accepted`; no price check is performed at submission.
    pub fn submit(&mut self, request: OrderRequest, bar_index: usize) -> Result<OrderId, BrokerError> {
        let slot = match request.side {
            OrderSide::Buy => Slot::Entry,
            OrderSide::Sell => Slot::Stop,
        };
        if let Some(live) = self.book.live_in_slot(slot) {
            return Err(BrokerError::SlotOccupied(live.id));
        }

        let id = self.book.next_id();
        let mut order = Order {
            id,
            side: request.side,
            kind: request.kind,
            size: request.size,
            status: OrderStatus::Submitted,
            created_bar: bar_index,
        };
        order.status = OrderStatus::Accepted;
        self.book.file(order, slot);
        Ok(id)
    }

    /// Cancel a live order. The terminal transition is acknowledged
    /// synchronously and also emitted as an event with the next step.
    pub fn cancel(&mut self, id: OrderId) -> Result<(), BrokerError> {
        let order = self.book.get(id).ok_or(BrokerError::UnknownOrder(id))?;
        if !order.is_live() {
            return Err(BrokerError::NotLive(id));
        }
        let slot = self.book.slot_of(id).expect("filed order has a slot");
        let order = self.book.get_mut(id).expect("order exists");
        order.status = OrderStatus::Canceled;
        self.pending_events.push(OrderEvent {
            order_id: id,
            slot,
            status: OrderStatus::Canceled,
            fill: None,
        });
        Ok(())
    }

    /// Resolve resting orders against this bar: stops first, then markets,
    /// each kind in submission order. Only orders created on earlier bars
    /// are eligible. Returns the terminal transitions of this bar, preceded
    /// by any cancellations acknowledged since the previous step.
    pub fn step(
        &mut self,
        bar: &SignalBar,
        bar_index: usize,
    ) -> Result<Vec<OrderEvent>, BrokerError> {
        let mut events = std::mem::take(&mut self.pending_events);

        let eligible = |order: &&Order| order.created_bar < bar_index;

        let stop_ids: Vec<OrderId> = self
            .book
            .live_orders()
            .filter(eligible)
            .filter(|o| matches!(o.kind, OrderKind::Stop { .. }))
            .map(|o| o.id)
            .collect();
        for id in stop_ids {
            self.resolve_stop(id, bar, &mut events)?;
        }

        let market_ids: Vec<OrderId> = self
            .book
            .live_orders()
            .filter(eligible)
            .filter(|o| matches!(o.kind, OrderKind::Market))
            .map(|o| o.id)
            .collect();
        for id in market_ids {
            self.resolve_market(id, bar, &mut events)?;
        }

        Ok(events)
    }

    fn resolve_stop(
        &mut self,
        id: OrderId,
        bar: &SignalBar,
        events: &mut Vec<OrderEvent>,
    ) -> Result<(), BrokerError> {
        let order = *self.book.get(id).ok_or(BrokerError::UnknownOrder(id))?;
        let trigger = order.trigger_price().expect("stop order has a trigger");
        if bar.low > trigger {
            return Ok(());
        }

        // Gap-through: the bar opened at or below the stop level.
        let price = if bar.open <= trigger {
            bar.open.min(trigger)
        } else {
            trigger
        };
        let units = match order.size {
            OrderSize::Units(units) => units,
            OrderSize::Notional(notional) => notional / price,
        };
        self.execute_sell(&order, price, units, units * price, bar, events)
    }

    fn resolve_market(
        &mut self,
        id: OrderId,
        bar: &SignalBar,
        events: &mut Vec<OrderEvent>,
    ) -> Result<(), BrokerError> {
        let order = *self.book.get(id).ok_or(BrokerError::UnknownOrder(id))?;
        match order.side {
            OrderSide::Buy => {
                self.execute_buy(&order, bar, events);
                Ok(())
            }
            OrderSide::Sell => {
                let units = match order.size {
                    OrderSize::Units(units) => units,
                    OrderSize::Notional(notional) => notional / bar.open,
                };
                self.execute_sell(&order, bar.open, units, units * bar.open, bar, events)
            }
        }
    }

    fn execute_buy(&mut self, order: &Order, bar: &SignalBar, events: &mut Vec<OrderEvent>) {
        // Resolving a notional at the fill price keeps the gross exact: an
        // all-in entry spends precisely the submitted cash amount.
        let (units, gross) = match order.size {
            OrderSize::Notional(notional) => (notional / bar.open, notional),
            OrderSize::Units(units) => (units, units * bar.open),
        };

        if units <= self.min_size {
            warn!(order_id = %order.id, units, "buy rejected: sub-minimum size");
            self.finalize(order.id, OrderStatus::Rejected, None, events);
            return;
        }

        let commission = gross.abs() * self.commission_rate;
        if gross + commission > self.cash {
            warn!(
                order_id = %order.id,
                gross,
                commission,
                cash = self.cash,
                "buy rejected: insufficient cash"
            );
            self.finalize(order.id, OrderStatus::Margin, None, events);
            return;
        }

        self.cash -= gross + commission;
        self.position.add(units, bar.open);
        let fill = Fill {
            order_id: order.id,
            timestamp: bar.datetime,
            side: OrderSide::Buy,
            price: bar.open,
            size: units,
            value: gross,
            commission,
        };
        self.finalize(order.id, OrderStatus::Completed, Some(fill), events);
    }

    fn execute_sell(
        &mut self,
        order: &Order,
        price: f64,
        units: f64,
        gross: f64,
        bar: &SignalBar,
        events: &mut Vec<OrderEvent>,
    ) -> Result<(), BrokerError> {
        if units > self.position.size + 1e-9 {
            return Err(BrokerError::Oversold {
                size: units,
                position: self.position.size,
            });
        }

        let commission = gross.abs() * self.commission_rate;
        self.cash += gross - commission;
        self.position.reduce(units);
        let fill = Fill {
            order_id: order.id,
            timestamp: bar.datetime,
            side: OrderSide::Sell,
            price,
            size: units,
            value: gross,
            commission,
        };
        self.finalize(order.id, OrderStatus::Completed, Some(fill), events);
        Ok(())
    }

    fn finalize(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        fill: Option<Fill>,
        events: &mut Vec<OrderEvent>,
    ) {
        let slot = self.book.slot_of(id).expect("filed order has a slot");
        let order = self.book.get_mut(id).expect("order exists");
        order.status = status;
        events.push(OrderEvent {
            order_id: id,
            slot,
            status,
            fill,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> SignalBar {
        SignalBar {
            datetime: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            entry_sig: false,
            entry_price: 0.0,
            exit_sig: false,
            exit_price: 0.0,
        }
    }

    fn config(initial_cash: f64, commission: f64) -> BacktestConfig {
        BacktestConfig {
            initial_cash,
            commission,
            ..BacktestConfig::default()
        }
    }

    fn fill_of(events: &[OrderEvent], id: OrderId) -> Fill {
        events
            .iter()
            .find(|e| e.order_id == id)
            .and_then(|e| e.fill)
            .expect("fill event")
    }

    // ── Submission ───────────────────────────────────────────────────

    #[test]
    fn submit_accepts_and_assigns_sequential_ids() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id1 = broker.submit(OrderRequest::market_buy(1000.0), 0).unwrap();
        let id2 = broker
            .submit(OrderRequest::stop_sell(95.0, 10.0), 0)
            .unwrap();
        assert_eq!(id1, OrderId(1));
        assert_eq!(id2, OrderId(2));
        assert_eq!(broker.order(id1).unwrap().status, OrderStatus::Accepted);
        assert!(broker.is_live(id1));
    }

    #[test]
    fn submit_rejects_occupied_slot() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id1 = broker.submit(OrderRequest::market_buy(1000.0), 0).unwrap();
        let err = broker
            .submit(OrderRequest::market_buy(500.0), 0)
            .unwrap_err();
        assert!(matches!(err, BrokerError::SlotOccupied(id) if id == id1));
    }

    // ── Market execution ─────────────────────────────────────────────

    #[test]
    fn market_buy_fills_at_next_bar_open() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id = broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();

        // Same bar: not eligible.
        let events = broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 0).unwrap();
        assert!(events.is_empty());
        assert!(broker.is_live(id));

        // Next bar: fills at its open.
        let events = broker.step(&bar(3, 101.0, 105.0, 100.0, 104.0), 1).unwrap();
        let fill = fill_of(&events, id);
        assert_eq!(fill.price, 101.0);
        assert!((fill.size - 10_000.0 / 101.0).abs() < 1e-12);
        assert_eq!(fill.value, 10_000.0);
        assert_eq!(broker.cash(), 0.0);
        assert!((broker.position().size - 10_000.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn buy_commission_is_debited_from_cash() {
        let mut broker = Broker::new(&config(10_000.0, 0.001));
        broker.submit(OrderRequest::market_buy(5000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        // 10_000 - 5000 - 5000 * 0.001
        assert!((broker.cash() - 4995.0).abs() < 1e-9);
    }

    #[test]
    fn buy_rejected_when_notional_plus_commission_exceeds_cash() {
        let mut broker = Broker::new(&config(10_000.0, 0.001));
        let id = broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        let events = broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, OrderStatus::Margin);
        assert!(events[0].fill.is_none());
        assert_eq!(broker.order(id).unwrap().status, OrderStatus::Margin);
        assert_eq!(broker.cash(), 10_000.0);
        assert!(broker.position().is_flat());
    }

    #[test]
    fn buy_rejected_below_minimum_size() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id = broker.submit(OrderRequest::market_buy(0.05), 0).unwrap();
        // 0.05 / 100 = 0.0005 units, below the 0.001 minimum.
        let events = broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();

        assert_eq!(events[0].status, OrderStatus::Rejected);
        assert_eq!(broker.order(id).unwrap().status, OrderStatus::Rejected);
        assert_eq!(broker.cash(), 10_000.0);
    }

    #[test]
    fn market_sell_fills_at_open() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        let id = broker.submit(OrderRequest::market_sell(size), 1).unwrap();
        let events = broker.step(&bar(3, 110.0, 112.0, 108.0, 111.0), 2).unwrap();
        let fill = fill_of(&events, id);
        assert_eq!(fill.price, 110.0);
        assert!(broker.position().is_flat());
        assert!((broker.cash() - size * 110.0).abs() < 1e-9);
    }

    // ── Stop execution ───────────────────────────────────────────────

    #[test]
    fn stop_triggers_when_low_reaches_trigger() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        let id = broker.submit(OrderRequest::stop_sell(96.0, size), 1).unwrap();
        // Bar opens above the trigger, trades down through it.
        let events = broker.step(&bar(3, 104.0, 110.0, 90.0, 92.0), 2).unwrap();
        let fill = fill_of(&events, id);
        assert_eq!(fill.price, 96.0);
        assert!(broker.position().is_flat());
    }

    #[test]
    fn stop_does_not_trigger_above_low() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        let id = broker.submit(OrderRequest::stop_sell(95.0, size), 1).unwrap();
        let events = broker.step(&bar(3, 100.0, 105.0, 98.0, 103.0), 2).unwrap();
        assert!(events.is_empty());
        assert!(broker.is_live(id));
    }

    #[test]
    fn stop_gap_through_fills_at_open() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        let id = broker.submit(OrderRequest::stop_sell(98.0, size), 1).unwrap();
        // Gap down: open 95 is already below the 98 trigger.
        let events = broker.step(&bar(3, 95.0, 97.0, 93.0, 96.0), 2).unwrap();
        let fill = fill_of(&events, id);
        assert_eq!(fill.price, 95.0);
    }

    #[test]
    fn stop_above_range_fills_on_first_eligible_bar() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(10_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        // Stop level far above the market: in the money immediately.
        let id = broker.submit(OrderRequest::stop_sell(150.0, size), 1).unwrap();
        let events = broker.step(&bar(3, 102.0, 106.0, 101.0, 105.0), 2).unwrap();
        let fill = fill_of(&events, id);
        // min(open, trigger) = the open.
        assert_eq!(fill.price, 102.0);
    }

    // ── Ordering ─────────────────────────────────────────────────────

    #[test]
    fn stops_resolve_before_markets_on_the_same_bar() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_buy(5_000.0), 0).unwrap();
        broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        let size = broker.position().size;

        // A resting stop and a fresh buy, both eligible on bar 2.
        let stop_id = broker.submit(OrderRequest::stop_sell(96.0, size), 1).unwrap();
        // Stop fires first so the Entry slot is free for the next buy only
        // after its own resolution; submit the buy before stepping.
        let buy_id = broker.submit(OrderRequest::market_buy(1_000.0), 1).unwrap();

        let events = broker.step(&bar(3, 104.0, 110.0, 90.0, 92.0), 2).unwrap();
        let ids: Vec<OrderId> = events.iter().map(|e| e.order_id).collect();
        assert_eq!(ids, vec![stop_id, buy_id]);
    }

    // ── Cancellation ─────────────────────────────────────────────────

    #[test]
    fn cancel_live_order_emits_event_on_next_step() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id = broker.submit(OrderRequest::stop_sell(95.0, 1.0), 0).unwrap();
        // Fake a long so the sell is covered if it were to trigger.
        broker.position.add(1.0, 100.0);

        broker.cancel(id).unwrap();
        assert_eq!(broker.order(id).unwrap().status, OrderStatus::Canceled);

        let events = broker.step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, id);
        assert_eq!(events[0].status, OrderStatus::Canceled);
    }

    #[test]
    fn cancel_terminal_order_fails() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        let id = broker.submit(OrderRequest::stop_sell(95.0, 1.0), 0).unwrap();
        broker.position.add(1.0, 100.0);
        broker.cancel(id).unwrap();

        assert!(matches!(broker.cancel(id), Err(BrokerError::NotLive(_))));
        assert!(matches!(
            broker.cancel(OrderId(99)),
            Err(BrokerError::UnknownOrder(_))
        ));
    }

    // ── Invariant guard ──────────────────────────────────────────────

    #[test]
    fn oversold_position_is_an_error() {
        let mut broker = Broker::new(&config(10_000.0, 0.0));
        broker.submit(OrderRequest::market_sell(5.0), 0).unwrap();
        let err = broker
            .step(&bar(2, 100.0, 101.0, 99.0, 100.0), 1)
            .unwrap_err();
        assert!(matches!(err, BrokerError::Oversold { .. }));
    }
}
