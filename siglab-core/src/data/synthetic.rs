//! Synthetic signal-series generator.
//!
//! Produces a realistic-looking bar series with drift, deterministic
//! pseudo-noise, periodic entry signals, and a trailing stop level column.
//! Used by the benchmarks and the CLI's sample-data command; no randomness,
//! so the series is identical across runs.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::SignalBar;

/// Tunable shape of the generated series.
#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    pub start: DateTime<Utc>,
    /// Per-bar drift applied to the close.
    pub drift: f64,
    /// Amplitude of the oscillating pseudo-noise, as a fraction of price.
    pub noise: f64,
    /// A new entry signal every `entry_every` bars.
    pub entry_every: usize,
    /// Stop level as a fraction of the close (trailing).
    pub stop_fraction: f64,
}

impl Default for SyntheticSeries {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap(),
            drift: 0.0004,
            noise: 0.01,
            entry_every: 15,
            stop_fraction: 0.95,
        }
    }
}

impl SyntheticSeries {
    /// Generate `n` daily bars.
    pub fn bars(&self, n: usize) -> Vec<SignalBar> {
        let mut close = 100.0_f64;
        (0..n)
            .map(|i| {
                let t = i as f64;
                // Two incommensurate oscillators stand in for noise.
                let wiggle = (t * 0.83).sin() * 0.6 + (t * 0.31).cos() * 0.4;
                let open = close;
                close = (close * (1.0 + self.drift + self.noise * wiggle)).max(1.0);
                let span = (open - close).abs().max(close * 0.004);
                let high = open.max(close) + span * 0.5;
                let low = (open.min(close) - span * 0.5).max(0.01);
                let entry_sig = i % self.entry_every == 0;
                SignalBar {
                    datetime: self.start + Duration::days(i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: 1_000_000.0 + (t * 0.57).sin().abs() * 500_000.0,
                    entry_sig,
                    entry_price: if entry_sig { close } else { 0.0 },
                    exit_sig: false,
                    exit_price: close * self.stop_fraction,
                }
            })
            .collect()
    }
}

/// Daily bars with the default series shape.
pub fn synthetic_bars(n: usize) -> Vec<SignalBar> {
    SyntheticSeries::default().bars(n)
}
