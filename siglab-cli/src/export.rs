//! Result artifact export (CSV/JSON).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use siglab_core::domain::{EquitySample, SignalBar, TradeAction, TradeRecord};
use siglab_core::{RunResult, Summary};

/// Write all artifacts for a completed run under `dir`:
/// `trades.csv`, `equity.csv`, and `summary.json`.
pub fn save_artifacts(dir: &Path, result: &RunResult) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;
    write_trades_csv(&dir.join("trades.csv"), &result.trades)?;
    write_equity_csv(&dir.join("equity.csv"), &result.equity_curve)?;
    write_summary_json(
        &dir.join("summary.json"),
        &result.summary,
        &result.warnings,
        &result.fingerprint,
    )?;
    Ok(())
}

pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create trades CSV {}", path.display()))?;

    writeln!(file, "timestamp,action,price,size,value,commission,pnl")?;
    for trade in trades {
        let action = match trade.action {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        };
        writeln!(
            file,
            "{},{},{:.8},{:.8},{:.8},{:.8},{:.8}",
            trade.timestamp.to_rfc3339(),
            action,
            trade.price,
            trade.size,
            trade.value,
            trade.commission,
            trade.pnl
        )?;
    }
    Ok(())
}

pub fn write_equity_csv(path: &Path, curve: &[EquitySample]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;

    writeln!(file, "timestamp,cash,position_value,total")?;
    for sample in curve {
        writeln!(
            file,
            "{},{:.8},{:.8},{:.8}",
            sample.timestamp.to_rfc3339(),
            sample.cash,
            sample.position_value,
            sample.total
        )?;
    }
    Ok(())
}

/// Write a bar series as a ten-column signal CSV, the same shape the
/// loader reads back.
pub fn write_bars_csv(path: &Path, bars: &[SignalBar]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create bar CSV {}", path.display()))?;

    writeln!(
        file,
        "datetime,open,high,low,close,volume,entry_sig,entry_price,exit_sig,exit_price"
    )?;
    for bar in bars {
        writeln!(
            file,
            "{},{:.6},{:.6},{:.6},{:.6},{:.2},{},{:.6},{},{:.6}",
            bar.datetime.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            u8::from(bar.entry_sig),
            bar.entry_price,
            u8::from(bar.exit_sig),
            bar.exit_price
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct SummaryArtifact<'a> {
    summary: &'a Summary,
    warnings: &'a [String],
    fingerprint: &'a str,
}

pub fn write_summary_json(
    path: &Path,
    summary: &Summary,
    warnings: &[String],
    fingerprint: &str,
) -> Result<()> {
    let artifact = SummaryArtifact {
        summary,
        warnings,
        fingerprint,
    };
    let json = serde_json::to_string_pretty(&artifact).context("failed to serialize summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write summary JSON {}", path.display()))?;
    Ok(())
}
