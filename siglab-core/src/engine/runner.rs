//! The bar-by-bar event loop.

use tracing::debug;

use crate::analyzers;
use crate::broker::Broker;
use crate::domain::{EquitySample, SignalBar};
use crate::feed::BarFeed;
use crate::fingerprint;
use crate::strategy::SignalStrategy;

use super::config::BacktestConfig;
use super::result::RunResult;
use super::EngineError;

/// Run a backtest over a pre-materialized, time-ordered bar sequence.
///
/// Validates the configuration and every bar before the loop starts
/// (bad input fails the run with no partial results), then drives the
/// broker and strategy bar by bar and derives the summary from the
/// completed trade log and equity curve. The engine is constructed per
/// backtest; a run is not reusable.
pub fn run_backtest(
    bars: Vec<SignalBar>,
    config: &BacktestConfig,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    let mut feed = BarFeed::new(bars)?;

    let mut broker = Broker::new(config);
    let mut strategy = SignalStrategy::new(config);
    let mut equity_curve: Vec<EquitySample> = Vec::with_capacity(feed.len());
    let mut bar_index = 0usize;

    while let Some(bar) = feed.next() {
        // Resolve resting orders first; fills for this bar reach the
        // strategy before its signal-driven action.
        let events = broker
            .step(&bar, bar_index)
            .map_err(|err| EngineError::InvariantViolation(err.to_string()))?;
        for event in &events {
            strategy.on_order_event(event, &bar, &mut broker, bar_index);
        }

        strategy.on_bar(&bar, &mut broker, bar_index);

        let cash = broker.cash();
        let position = *broker.position();
        if cash < 0.0 {
            return Err(EngineError::InvariantViolation(format!(
                "cash went negative at bar {bar_index}: {cash}"
            )));
        }
        if position.size < 0.0 {
            return Err(EngineError::InvariantViolation(format!(
                "position went negative at bar {bar_index}: {}",
                position.size
            )));
        }

        let position_value = position.market_value(bar.close);
        equity_curve.push(EquitySample {
            timestamp: bar.datetime,
            cash,
            position_value,
            total: cash + position_value,
        });
        bar_index += 1;
    }

    debug!(
        bars = equity_curve.len(),
        trades = strategy.trades().len(),
        "bar loop complete"
    );

    let warnings = strategy.take_warnings();
    let summary = analyzers::summarize(config, &equity_curve, strategy.trades(), feed.produced());
    let fingerprint = fingerprint::run_fingerprint(config, feed.produced());
    let orders = broker.book().orders().copied().collect();

    // The online win/loss counters must agree with the persisted log.
    debug_assert_eq!(summary.winning_trades, strategy.winning_trades());
    debug_assert_eq!(summary.losing_trades, strategy.losing_trades());

    Ok(RunResult {
        trades: strategy.into_trades(),
        orders,
        equity_curve,
        summary,
        warnings,
        fingerprint,
    })
}
