//! siglab CLI — run signal backtests from CSV data and export artifacts.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file
//! - `validate` — check a bar CSV without running a backtest
//! - `sample-data` — write a synthetic bar CSV to experiment with

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use siglab_core::data::{load_bars_csv, synthetic_bars};
use siglab_core::feed::BarFeed;
use siglab_core::{run_backtest, Summary};

mod config;
mod export;

use config::RunConfig;

#[derive(Parser)]
#[command(name = "siglab", about = "siglab — signal-driven backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the bar CSV path from the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Override the artifact output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate a bar CSV without running a backtest.
    Validate {
        /// Path to the bar CSV file.
        #[arg(long)]
        data: PathBuf,
    },
    /// Write a synthetic sample bar CSV to experiment with.
    SampleData {
        /// Destination CSV path.
        #[arg(long, default_value = "sample_bars.csv")]
        out: PathBuf,

        /// Number of daily bars to generate.
        #[arg(long, default_value_t = 500)]
        bars: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
        } => run_cmd(&config, data, output_dir),
        Commands::Validate { data } => validate_cmd(&data),
        Commands::SampleData { out, bars } => sample_data_cmd(&out, bars),
    }
}

fn run_cmd(
    config_path: &PathBuf,
    data: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut run_config = RunConfig::load(config_path)?;
    if let Some(data) = data {
        run_config.data = data;
    }
    if let Some(output_dir) = output_dir {
        run_config.output_dir = output_dir;
    }

    let bars = load_bars_csv(&run_config.data)
        .with_context(|| format!("failed to load bars from {}", run_config.data.display()))?;
    info!(bars = bars.len(), data = %run_config.data.display(), "loaded bar data");

    let result = run_backtest(bars, &run_config.backtest).context("backtest failed")?;

    print_summary(&result.summary);
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    export::save_artifacts(&run_config.output_dir, &result)?;
    info!(
        output_dir = %run_config.output_dir.display(),
        fingerprint = %result.fingerprint,
        "artifacts written"
    );
    Ok(())
}

fn validate_cmd(data: &PathBuf) -> Result<()> {
    let bars =
        load_bars_csv(data).with_context(|| format!("failed to load {}", data.display()))?;
    let feed = BarFeed::new(bars).context("bar validation failed")?;
    println!("{}: {} bars OK", data.display(), feed.len());
    Ok(())
}

fn sample_data_cmd(out: &PathBuf, bars: usize) -> Result<()> {
    let series = synthetic_bars(bars);
    export::write_bars_csv(out, &series)?;
    println!("wrote {} synthetic bars to {}", series.len(), out.display());
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("── backtest summary ──────────────────────────");
    println!("initial value        {:>14.2}", summary.initial_value);
    println!("final value          {:>14.2}", summary.final_value);
    println!(
        "total return         {:>13.2}%",
        summary.total_return * 100.0
    );
    println!(
        "annual return        {:>13.2}%",
        summary.annual_return * 100.0
    );
    match summary.sharpe_ratio {
        Some(sharpe) => println!("sharpe ratio         {sharpe:>14.3}"),
        None => println!("sharpe ratio         {:>14}", "n/a"),
    }
    println!(
        "max drawdown         {:>13.2}%  ({:.2})",
        summary.max_drawdown * 100.0,
        summary.max_drawdown_amount
    );
    println!("trades               {:>14}", summary.total_trades);
    println!(
        "won / lost           {:>7} / {:<6}",
        summary.winning_trades, summary.losing_trades
    );
    println!("win rate             {:>13.2}%", summary.win_rate);
    println!("avg win / avg loss   {:>9.2} / {:<9.2}", summary.avg_win, summary.avg_loss);
    println!(
        "signals (entry/exit) {:>7} / {:<6}",
        summary.total_entry_signals, summary.total_exit_signals
    );
}
