//! Analyzers — pure functions deriving performance metrics from the equity
//! curve and the completed trade log.
//!
//! Every metric is a pure function: equity curve and/or trade list in,
//! scalar out. Conventions:
//! - A trade is counted on its SELL record only; zero P&L counts as a loss.
//! - The annualized return compounds per-bar returns to a 365-bar year.
//! - The Sharpe-like ratio uses the configured annualization factor and is
//!   unavailable when the return series is shorter than two samples or has
//!   zero deviation.

use serde::{Deserialize, Serialize};

use crate::domain::{EquitySample, SignalBar, TradeAction, TradeRecord};
use crate::engine::BacktestConfig;

/// Periods per year used to annualize the compounded return.
const RETURN_COMPOUNDING_PERIODS: f64 = 365.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    /// `None` when the return series is degenerate (serialized as null).
    pub sharpe_ratio: Option<f64>,
    /// Largest peak-to-trough decline as a positive fraction of the peak.
    pub max_drawdown: f64,
    /// Largest peak-to-trough decline in money terms.
    pub max_drawdown_amount: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Winning trades as a percentage of total trades.
    pub win_rate: f64,
    pub total_entry_signals: usize,
    pub total_exit_signals: usize,
}

/// Compute the full summary at end of run.
pub fn summarize(
    config: &BacktestConfig,
    equity_curve: &[EquitySample],
    trades: &[TradeRecord],
    bars: &[SignalBar],
) -> Summary {
    let initial_value = config.initial_cash;
    let final_value = equity_curve
        .last()
        .map(|sample| sample.total)
        .unwrap_or(initial_value);

    let returns = bar_returns(initial_value, equity_curve);
    let (max_drawdown, max_drawdown_amount) = max_drawdown(equity_curve);
    let stats = trade_stats(trades);

    Summary {
        initial_value,
        final_value,
        total_return: total_return(initial_value, final_value),
        annual_return: annual_return(initial_value, final_value, equity_curve.len()),
        sharpe_ratio: sharpe_ratio(&returns, config.annualization_factor),
        max_drawdown,
        max_drawdown_amount,
        total_trades: stats.total,
        winning_trades: stats.won,
        losing_trades: stats.lost,
        avg_win: stats.avg_win,
        avg_loss: stats.avg_loss,
        win_rate: stats.win_rate,
        total_entry_signals: bars.iter().filter(|b| b.entry_sig).count(),
        total_exit_signals: bars.iter().filter(|b| b.exit_sig).count(),
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: `final / initial - 1`.
pub fn total_return(initial_value: f64, final_value: f64) -> f64 {
    if initial_value <= 0.0 {
        return 0.0;
    }
    final_value / initial_value - 1.0
}

/// Annualized return, compounding the per-bar growth to a 365-bar year.
///
/// Returns 0.0 for an empty curve or non-positive equity.
pub fn annual_return(initial_value: f64, final_value: f64, bar_count: usize) -> f64 {
    if bar_count == 0 || initial_value <= 0.0 || final_value <= 0.0 {
        return 0.0;
    }
    let growth = final_value / initial_value;
    growth.powf(RETURN_COMPOUNDING_PERIODS / bar_count as f64) - 1.0
}

/// Per-bar returns of the equity curve, with the first bar's return taken
/// against the initial equity.
pub fn bar_returns(initial_equity: f64, equity_curve: &[EquitySample]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(equity_curve.len());
    let mut prev = initial_equity;
    for sample in equity_curve {
        returns.push(if prev > 0.0 {
            (sample.total - prev) / prev
        } else {
            0.0
        });
        prev = sample.total;
    }
    returns
}

/// Sharpe-like ratio: `mean(returns) / stdev(returns) * sqrt(factor)`.
///
/// Unavailable (`None`) with fewer than two samples or zero deviation.
pub fn sharpe_ratio(returns: &[f64], annualization_factor: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let mean = mean(returns);
    let std = std_dev(returns);
    if std < 1e-15 {
        return None;
    }
    Some(mean / std * annualization_factor.sqrt())
}

/// Maximum drawdown against the running peak of the equity curve.
///
/// Returns `(fraction, amount)`, both positive; `(0, 0)` when equity never
/// declines.
pub fn max_drawdown(equity_curve: &[EquitySample]) -> (f64, f64) {
    let mut peak = match equity_curve.first() {
        Some(sample) => sample.total,
        None => return (0.0, 0.0),
    };
    let mut max_fraction = 0.0_f64;
    let mut max_amount = 0.0_f64;

    for sample in equity_curve {
        if sample.total > peak {
            peak = sample.total;
        }
        let amount = peak - sample.total;
        if amount > max_amount {
            max_amount = amount;
        }
        if peak > 0.0 {
            let fraction = amount / peak;
            if fraction > max_fraction {
                max_fraction = fraction;
            }
        }
    }
    (max_fraction, max_amount)
}

/// Trade-level statistics over the completed trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    /// Completed round trips: one per SELL record.
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub win_rate: f64,
}

pub fn trade_stats(trades: &[TradeRecord]) -> TradeStats {
    let mut won = 0usize;
    let mut lost = 0usize;
    let mut win_total = 0.0;
    let mut loss_total = 0.0;

    for trade in trades.iter().filter(|t| t.action == TradeAction::Sell) {
        if trade.pnl > 0.0 {
            won += 1;
            win_total += trade.pnl;
        } else {
            lost += 1;
            loss_total += trade.pnl;
        }
    }

    let total = won + lost;
    TradeStats {
        total,
        won,
        lost,
        avg_win: if won > 0 { win_total / won as f64 } else { 0.0 },
        avg_loss: if lost > 0 { loss_total / lost as f64 } else { 0.0 },
        win_rate: if total > 0 {
            won as f64 / total as f64 * 100.0
        } else {
            0.0
        },
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
