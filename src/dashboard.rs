//! Assembly of everything one dashboard render needs.
//!
//! A render runs top to bottom: cached load, company selection, the
//! per-company views for charts 1 to 4, then the cross-company correlation
//! for chart 5. Nothing is kept between renders except the load cache.

use crate::cache::DataCache;
use crate::config::DashboardFileConfig;
use crate::correlation::{closing_price_table, correlation_matrix, CorrelationMatrix};
use crate::error::Result;
use crate::pipeline::CompanyView;
use crate::selector::CompanySelector;
use crate::types::{CombinedTable, Granularity, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// User controls: the selected company and resample frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub company: Option<String>,
    pub granularity: Option<Granularity>,
}

/// Derived data for one full page render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Sorted choices for the company selector.
    pub companies: Vec<String>,
    pub selected: String,
    pub granularity: Granularity,
    pub ma_windows: Vec<usize>,
    pub view: CompanyView,
    pub correlation: CorrelationMatrix,
    /// Number of dates shared by every company.
    pub correlation_rows: usize,
    pub total_records: usize,
}

impl Dashboard {
    /// Derive every view from an already-loaded table.
    pub fn build(
        table: &CombinedTable,
        company: Option<&str>,
        granularity: Granularity,
        ma_windows: &[usize],
    ) -> Result<Self> {
        let selector = CompanySelector::from_table(table);
        let selected = selector.select(company)?.to_string();

        let view = CompanyView::build(table, &selected, granularity, ma_windows)?;

        let prices = closing_price_table(table, &table.tickers_in_load_order())?;
        let correlation = correlation_matrix(&prices);

        Ok(Self {
            companies: selector.tickers().to_vec(),
            selected,
            granularity,
            ma_windows: ma_windows.to_vec(),
            view,
            correlation,
            correlation_rows: prices.len(),
            total_records: table.len(),
        })
    }
}

/// Latest value of one moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestAverage {
    pub window: usize,
    pub value: Option<f64>,
}

/// Compact numeric digest of a dashboard, for terminal and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub ticker: String,
    pub granularity: Granularity,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_close: Option<f64>,
    pub moving_averages: Vec<LatestAverage>,
    pub last_daily_return_pct: Option<f64>,
    /// Mean of the present daily returns.
    pub mean_daily_return_pct: Option<f64>,
    pub resampled: Series,
    pub correlation: CorrelationMatrix,
    pub correlation_rows: usize,
}

impl DashboardSummary {
    pub fn from_dashboard(dashboard: &Dashboard) -> Self {
        let view = &dashboard.view;
        let returns: Vec<f64> = view.daily_return_pct.iter().flatten().copied().collect();
        let mean_daily_return_pct = if returns.is_empty() {
            None
        } else {
            Some(returns.iter().sum::<f64>() / returns.len() as f64)
        };

        Self {
            ticker: view.ticker.clone(),
            granularity: view.granularity,
            rows: view.len(),
            first_date: view.dates.first().copied(),
            last_date: view.dates.last().copied(),
            last_close: view.close.last().copied(),
            moving_averages: view
                .moving_averages
                .iter()
                .map(|ma| LatestAverage {
                    window: ma.window,
                    value: ma.values.last().copied().flatten(),
                })
                .collect(),
            last_daily_return_pct: view.daily_return_pct.last().copied().flatten(),
            mean_daily_return_pct,
            resampled: view.resampled.clone(),
            correlation: dashboard.correlation.clone(),
            correlation_rows: dashboard.correlation_rows,
        }
    }
}

/// Fetch the combined table for `config` through the shared cache.
pub fn load_table(cache: &DataCache, config: &DashboardFileConfig) -> Result<Arc<CombinedTable>> {
    cache.get_or_load(&config.data.path, &config.data.files, &config.to_data_config())
}

/// Run the whole pipeline for one request.
pub fn render_dashboard(
    cache: &DataCache,
    config: &DashboardFileConfig,
    request: &DashboardRequest,
) -> Result<Dashboard> {
    let table = load_table(cache, config)?;
    let granularity = request
        .granularity
        .unwrap_or(config.analysis.default_frequency);

    let dashboard = Dashboard::build(
        &table,
        request.company.as_deref(),
        granularity,
        &config.analysis.ma_windows,
    )?;
    info!(
        "Rendered dashboard for {} ({}, {} rows)",
        dashboard.selected,
        granularity,
        dashboard.view.len()
    );
    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::types::PriceRecord;
    use chrono::NaiveDate;

    fn table() -> CombinedTable {
        let mut records = Vec::new();
        for (ticker, base) in [("MSFT", 50.0), ("AAPL", 100.0)] {
            for day in 1..=25u32 {
                let date = NaiveDate::from_ymd_opt(2017, 3, day).unwrap();
                records.push(PriceRecord::new(ticker, date, base + (day as f64).sqrt()));
            }
        }
        CombinedTable::new(records)
    }

    #[test]
    fn test_build_defaults_to_first_company() {
        let dashboard = Dashboard::build(&table(), None, Granularity::Monthly, &[10, 20]).unwrap();
        assert_eq!(dashboard.selected, "AAPL");
        assert_eq!(dashboard.companies, vec!["AAPL", "MSFT"]);
        assert_eq!(dashboard.view.resampled.len(), 1);
        assert_eq!(dashboard.correlation_rows, 25);
        // Correlation follows load order, not sorted order.
        assert_eq!(dashboard.correlation.tickers, vec!["MSFT", "AAPL"]);
        assert!((dashboard.correlation.get("MSFT", "AAPL").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_unknown_company() {
        assert!(matches!(
            Dashboard::build(&table(), Some("IBM"), Granularity::Monthly, &[10]),
            Err(DashboardError::UnknownCompany(_))
        ));
    }

    #[test]
    fn test_summary_takes_latest_values() {
        let dashboard = Dashboard::build(&table(), Some("MSFT"), Granularity::Monthly, &[10, 50]).unwrap();
        let summary = DashboardSummary::from_dashboard(&dashboard);

        assert_eq!(summary.ticker, "MSFT");
        assert_eq!(summary.rows, 25);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2017, 3, 1));
        assert_eq!(summary.last_close, Some(55.0));
        // 25 rows: the 10-day average is defined at the end, the 50-day is not.
        assert!(summary.moving_averages[0].value.is_some());
        assert_eq!(summary.moving_averages[1], LatestAverage { window: 50, value: None });
        assert!(summary.last_daily_return_pct.unwrap() > 0.0);
        assert!(summary.mean_daily_return_pct.unwrap() > 0.0);
    }

    #[test]
    fn test_render_missing_file_caches_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = DashboardFileConfig::default();
        config.data.path = dir.path().display().to_string();
        let cache = DataCache::new();

        let err = render_dashboard(&cache, &config, &DashboardRequest::default()).unwrap_err();
        assert!(matches!(err, DashboardError::MissingFile { .. }));
        assert!(cache.is_empty());
    }
}
