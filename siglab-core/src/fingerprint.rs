//! Deterministic run fingerprinting.
//!
//! Two runs over identical configuration and bar data carry identical
//! fingerprints, so a stored result can be matched to its inputs. Uses
//! BLAKE3 for a stable, collision-resistant hash across builds and
//! platforms.

use crate::domain::SignalBar;
use crate::engine::BacktestConfig;

/// Content hash of the bar series.
pub fn dataset_hash(bars: &[SignalBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.datetime.timestamp_millis().to_le_bytes());
        for value in [
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.entry_price,
            bar.exit_price,
        ] {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        hasher.update(&[u8::from(bar.entry_sig), u8::from(bar.exit_sig)]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Fingerprint of a run: configuration + dataset hash + bar count, hashed
/// over a canonical JSON serialization.
pub fn run_fingerprint(config: &BacktestConfig, bars: &[SignalBar]) -> String {
    let canonical = serde_json::json!({
        "config": config,
        "dataset_hash": dataset_hash(bars),
        "bar_count": bars.len(),
    });
    blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string()
}
