//! Stockdash - a single-page technical analysis dashboard for tech stocks.
//!
//! # Overview
//!
//! Stockdash loads one daily price file per company, tags every row with the
//! company's ticker and derives the views behind a five-chart dashboard:
//!
//! - **Closing price** of the selected company over time
//! - **Moving averages** of the close (10, 20 and 50 days by default)
//! - **Daily return** in percent
//! - **Resampled close**: the mean per month, quarter or year
//! - **Correlation heatmap** of closing prices across all companies
//!
//! The page is served by an axum server that recomputes everything on each
//! control change, or written once to a static HTML file.
//!
//! # Quick Start
//!
//! ```no_run
//! use stockdash::{
//!     cache::DataCache,
//!     config::DashboardFileConfig,
//!     dashboard::{render_dashboard, DashboardRequest},
//!     types::Granularity,
//! };
//!
//! let config = DashboardFileConfig::default();
//! let cache = DataCache::new();
//!
//! let request = DashboardRequest {
//!     company: Some("MSFT".to_string()),
//!     granularity: Some(Granularity::Quarterly),
//! };
//! let dashboard = render_dashboard(&cache, &config, &request).unwrap();
//!
//! println!("{} rows for {}", dashboard.view.len(), dashboard.selected);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core data types (PriceRecord, CombinedTable, Series, Granularity)
//! - [`data`]: Per-company CSV loading
//! - [`cache`]: Load cache shared across renders
//! - [`selector`]: Company selection
//! - [`indicators`]: Rolling mean, percent change, resampling, Pearson correlation
//! - [`pipeline`]: Per-company views for charts 1 to 4
//! - [`correlation`]: Date-aligned closing prices and the correlation matrix
//! - [`dashboard`]: One full render request
//! - [`viz`]: SVG line charts and heatmap
//! - [`export`]: HTML page rendering
//! - [`server`]: HTTP surface
//! - [`config`]: TOML configuration file support

pub mod cache;
pub mod config;
pub mod correlation;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod export;
pub mod indicators;
pub mod pipeline;
pub mod selector;
pub mod server;
pub mod types;
pub mod viz;

// Re-exports for convenience
pub use cache::DataCache;
pub use config::DashboardFileConfig;
pub use correlation::{closing_price_table, correlation_matrix, ClosePriceTable, CorrelationMatrix};
pub use dashboard::{render_dashboard, Dashboard, DashboardRequest, DashboardSummary};
pub use data::{load_all, load_csv, DataConfig};
pub use error::{DashboardError, Result};
pub use indicators::{pct_change, pearson, resample_mean, rolling_mean};
pub use pipeline::CompanyView;
pub use selector::CompanySelector;
pub use types::{CombinedTable, Granularity, PriceRecord, Series, SeriesPoint};

// Rendering
pub use export::{export_dashboard_html, render_dashboard_html, render_error_html, HtmlOptions};
pub use viz::{correlation_heatmap_svg, line_chart_svg, HeatmapSvgConfig, LineChartConfig};
