//! Configuration file support for the dashboard.
//!
//! Settings are loaded from a TOML file; every field has a default so a
//! missing file section (or no file at all) yields the standard four-company
//! dashboard.

use crate::data::DataConfig;
use crate::error::{DashboardError, Result};
use crate::pipeline::DEFAULT_MA_WINDOWS;
use crate::types::Granularity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete dashboard configuration loaded from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFileConfig {
    /// Input data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,
}

/// Input data settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory containing the per-company files.
    #[serde(default = "default_data_path")]
    pub path: String,
    /// Per-company file names, `<TICKER>_data.csv`.
    #[serde(default = "default_files")]
    pub files: Vec<String>,
    /// Date format in the CSV files.
    #[serde(default)]
    pub date_format: Option<String>,
    /// CSV delimiter; auto-detected when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Skip malformed rows instead of failing the load.
    #[serde(default)]
    pub skip_invalid: bool,
}

fn default_data_path() -> String { "S&P_resources/individual_stocks_5yr".to_string() }
fn default_files() -> Vec<String> {
    ["AAPL_data.csv", "AMZN_data.csv", "GOOG_data.csv", "MSFT_data.csv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            files: default_files(),
            date_format: None,
            delimiter: None,
            skip_invalid: false,
        }
    }
}

/// Analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Moving-average windows, in days.
    #[serde(default = "default_ma_windows")]
    pub ma_windows: Vec<usize>,
    /// Resample frequency used when the request does not pick one.
    #[serde(default)]
    pub default_frequency: Granularity,
}

fn default_ma_windows() -> Vec<usize> { DEFAULT_MA_WINDOWS.to_vec() }

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            ma_windows: default_ma_windows(),
            default_frequency: Granularity::Monthly,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl DashboardFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: DashboardFileConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.data.files.is_empty() {
            return Err(DashboardError::ConfigError(
                "data.files must list at least one company file".to_string(),
            ));
        }
        if self.analysis.ma_windows.contains(&0) {
            return Err(DashboardError::ConfigError(
                "analysis.ma_windows entries must be at least 1".to_string(),
            ));
        }
        if let Some(delim) = self.data.delimiter {
            if !delim.is_ascii() {
                return Err(DashboardError::ConfigError(format!(
                    "data.delimiter must be a single ASCII character, got {:?}",
                    delim
                )));
            }
        }
        if self.server.port == 0 {
            return Err(DashboardError::ConfigError(
                "server.port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Loader options derived from the `[data]` section.
    pub fn to_data_config(&self) -> DataConfig {
        DataConfig {
            date_format: self.data.date_format.clone(),
            delimiter: self.data.delimiter.map(|c| c as u8),
            skip_invalid: self.data.skip_invalid,
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Stock dashboard configuration

[data]
path = "S&P_resources/individual_stocks_5yr"
files = ["AAPL_data.csv", "AMZN_data.csv", "GOOG_data.csv", "MSFT_data.csv"]
# date_format = "%Y-%m-%d"
# delimiter = ","
skip_invalid = false

[analysis]
ma_windows = [10, 20, 50]
default_frequency = "Monthly"   # Monthly, Quarterly or Yearly

[server]
bind = "127.0.0.1"
port = 8501
"#
        .to_string()
    }
}
