//! CSV bar loader.
//!
//! Reads the ten-column signal file
//! (`datetime,open,high,low,close,volume,entry_sig,entry_price,exit_sig,exit_price`)
//! and converts each row into a validated [`SignalBar`]. Signal columns must
//! be exactly 0 or 1; numeric cells must be finite. Ordering and OHLC-range
//! validation happen in the feed constructor.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use super::DataError;
use crate::domain::SignalBar;

/// Raw CSV row, before validation.
#[derive(Debug, Deserialize)]
struct RawRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    entry_sig: f64,
    entry_price: f64,
    #[serde(alias = "sell_sig")]
    exit_sig: f64,
    #[serde(alias = "sell_price")]
    exit_price: f64,
}

/// Load bars from a CSV file on disk.
pub fn load_bars_csv(path: &Path) -> Result<Vec<SignalBar>, DataError> {
    let file = std::fs::File::open(path)?;
    read_bars(file)
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<SignalBar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (idx, result) in csv_reader.deserialize::<RawRow>().enumerate() {
        let row = idx + 1; // 1-based, excluding the header
        let raw = result?;
        bars.push(convert_row(raw, row)?);
    }
    Ok(bars)
}

fn convert_row(raw: RawRow, row: usize) -> Result<SignalBar, DataError> {
    let datetime = parse_datetime(&raw.datetime).ok_or_else(|| DataError::BadDatetime {
        row,
        value: raw.datetime.clone(),
    })?;

    check_finite(raw.open, row, "open")?;
    check_finite(raw.high, row, "high")?;
    check_finite(raw.low, row, "low")?;
    check_finite(raw.close, row, "close")?;
    check_finite(raw.volume, row, "volume")?;
    check_finite(raw.entry_price, row, "entry_price")?;
    check_finite(raw.exit_price, row, "exit_price")?;

    Ok(SignalBar {
        datetime,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
        entry_sig: parse_signal(raw.entry_sig, row, "entry_sig")?,
        entry_price: raw.entry_price,
        exit_sig: parse_signal(raw.exit_sig, row, "exit_sig")?,
        exit_price: raw.exit_price,
    })
}

fn check_finite(value: f64, row: usize, column: &'static str) -> Result<(), DataError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DataError::MissingCell { row, column })
    }
}

fn parse_signal(value: f64, row: usize, column: &'static str) -> Result<bool, DataError> {
    if value == 0.0 {
        Ok(false)
    } else if value == 1.0 {
        Ok(true)
    } else {
        Err(DataError::BadSignal { row, column, value })
    }
}

/// Parse a wall-clock timestamp. Accepts `YYYY-MM-DD HH:MM:SS`, RFC 3339,
/// and date-only (`YYYY-MM-DD`, taken as midnight UTC).
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
