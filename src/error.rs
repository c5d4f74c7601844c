//! Error types for the dashboard.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for loading, analysis and rendering.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Error: File not found at {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Malformed row {row} in {file}: {reason}")]
    MalformedRow {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("Unknown company: {0}")]
    UnknownCompany(String),

    #[error("Invalid resample frequency: {0} (expected Monthly, Quarterly or Yearly)")]
    InvalidGranularity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data loaded")]
    NoData,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl DashboardError {
    /// True for errors caused by the caller's request rather than the data on disk.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DashboardError::UnknownCompany(_)
                | DashboardError::InvalidGranularity(_)
                | DashboardError::InvalidInput(_)
        )
    }
}

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
