//! Company selection.

use crate::error::{DashboardError, Result};
use crate::types::CombinedTable;

/// The set of companies a user can choose from, in sorted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySelector {
    tickers: Vec<String>,
}

impl CompanySelector {
    pub fn from_table(table: &CombinedTable) -> Self {
        Self {
            tickers: table.tickers(),
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// First ticker in sorted order, used when nothing has been selected yet.
    pub fn default_ticker(&self) -> Option<&str> {
        self.tickers.first().map(String::as_str)
    }

    /// Resolve the user's choice to exactly one ticker.
    ///
    /// No request (or an empty one) picks the default. An unknown ticker is an
    /// error rather than a silent fallback.
    pub fn select(&self, requested: Option<&str>) -> Result<&str> {
        match requested.map(str::trim).filter(|r| !r.is_empty()) {
            None => self.default_ticker().ok_or(DashboardError::NoData),
            Some(wanted) => self
                .tickers
                .iter()
                .find(|t| t.as_str() == wanted)
                .map(String::as_str)
                .ok_or_else(|| DashboardError::UnknownCompany(wanted.to_string())),
        }
    }
}
