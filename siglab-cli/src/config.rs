//! Serializable run configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use siglab_core::BacktestConfig;

/// TOML run configuration: where the bars come from, where artifacts go,
/// and the engine options.
///
/// ```toml
/// data = "bars.csv"
/// output_dir = "results"
///
/// [backtest]
/// initial_cash = 100000.0
/// commission = 0.001
/// risk_percent = 2.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path to the bar CSV file.
    pub data: PathBuf,

    /// Output directory for result artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Engine options; omitted fields take the documented defaults.
    #[serde(default)]
    pub backtest: BacktestConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }
}
