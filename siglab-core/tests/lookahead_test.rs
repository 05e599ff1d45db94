//! Look-ahead guards: no order executes on the bar it was submitted.

use chrono::{TimeZone, Utc};
use siglab_core::domain::{OrderKind, OrderSide, SignalBar, TradeAction};
use siglab_core::{run_backtest, BacktestConfig};

fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> SignalBar {
    SignalBar {
        datetime: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: 1.0,
        entry_sig: false,
        entry_price: 0.0,
        exit_sig: false,
        exit_price: 1.0,
    }
}

fn all_in_config() -> BacktestConfig {
    BacktestConfig {
        initial_cash: 10_000.0,
        commission: 0.0,
        risk_percent: 100.0,
        max_position_size: 1.0,
        ..BacktestConfig::default()
    }
}

#[test]
fn entry_fills_at_the_next_bar_open_not_the_signal_bar() {
    let mut bars = vec![
        bar(1, 100.0, 101.0, 99.0, 100.0),
        bar(2, 107.0, 109.0, 106.0, 108.0),
    ];
    bars[0].entry_sig = true;
    bars[0].entry_price = 100.0;

    let result = run_backtest(bars, &all_in_config()).unwrap();
    let buy = result.trades[0];
    assert_eq!(buy.timestamp.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    // Signal-bar prices never leak into the fill.
    assert_eq!(buy.price, 107.0);
}

#[test]
fn entry_on_the_final_bar_is_never_filled() {
    let mut bars = vec![
        bar(1, 100.0, 101.0, 99.0, 100.0),
        bar(2, 100.0, 101.0, 99.0, 100.0),
    ];
    bars[1].entry_sig = true;
    bars[1].entry_price = 100.0;

    let config = all_in_config();
    let result = run_backtest(bars, &config).unwrap();

    // The order was placed but its execution would require bar N+1.
    assert!(result.trades.is_empty());
    let live_buys = result
        .orders
        .iter()
        .filter(|o| o.is_live() && o.side == OrderSide::Buy)
        .count();
    assert_eq!(live_buys, 1);
    assert_eq!(result.summary.final_value, config.initial_cash);
}

#[test]
fn stop_does_not_trigger_on_its_placement_bar() {
    // The buy fills on bar 2 and the stop is placed at 100.5, above bar 2's
    // low of 100. Same-bar execution would stop out immediately; the rules
    // defer it to bar 3.
    let mut bars = vec![
        bar(1, 100.0, 101.0, 99.5, 100.0),
        bar(2, 101.0, 103.0, 100.0, 102.0),
        bar(3, 104.0, 105.0, 99.0, 100.0),
    ];
    bars[0].entry_sig = true;
    bars[0].entry_price = 100.0;
    bars[1].exit_price = 100.5;
    bars[2].exit_price = 100.5;

    let result = run_backtest(bars, &all_in_config()).unwrap();
    assert_eq!(result.trades.len(), 2);
    let sell = result.trades[1];
    assert_eq!(sell.action, TradeAction::Sell);
    assert_eq!(sell.timestamp.to_rfc3339(), "2024-01-03T00:00:00+00:00");
    // Bar 3 opens at 104 above the 100.5 trigger: execution at the trigger.
    assert_eq!(sell.price, 100.5);
}

#[test]
fn in_the_money_stop_executes_on_the_first_eligible_bar() {
    // Stop level above the whole range: it fires at the very next step, at
    // min(open, trigger).
    let mut bars = vec![
        bar(1, 100.0, 101.0, 99.5, 100.0),
        bar(2, 101.0, 103.0, 100.0, 102.0),
        bar(3, 103.0, 105.0, 102.0, 104.0),
    ];
    bars[0].entry_sig = true;
    bars[0].entry_price = 100.0;
    bars[1].exit_price = 150.0;
    bars[2].exit_price = 150.0;

    let result = run_backtest(bars, &all_in_config()).unwrap();
    let sell = result.trades[1];
    assert_eq!(sell.timestamp.to_rfc3339(), "2024-01-03T00:00:00+00:00");
    assert_eq!(sell.price, 103.0);
}

#[test]
fn replaced_stop_is_not_retriggered() {
    // The cancelled stop's trigger would have fired on bar 4; only the
    // replacement level matters.
    let mut bars = vec![
        bar(1, 100.0, 101.0, 99.5, 100.0),
        bar(2, 101.0, 103.0, 100.5, 102.0),
        bar(3, 102.0, 104.0, 101.5, 103.0),
        bar(4, 102.0, 103.0, 100.8, 101.0),
    ];
    bars[0].entry_sig = true;
    bars[0].entry_price = 100.0;
    bars[1].exit_price = 101.0; // initial stop
    bars[2].exit_price = 100.0; // replacement, below bar 4's low
    bars[3].exit_price = 100.0;

    let result = run_backtest(bars, &all_in_config()).unwrap();
    // Bar 4's low of 100.8 is below the old 101 trigger but above the live
    // 100 trigger: no sell.
    assert_eq!(result.trades.len(), 1);
    let live_stops: Vec<_> = result
        .orders
        .iter()
        .filter(|o| o.is_live() && matches!(o.kind, OrderKind::Stop { .. }))
        .collect();
    assert_eq!(live_stops.len(), 1);
    assert_eq!(live_stops[0].trigger_price(), Some(100.0));
}
