//! HTTP surface: the dashboard page plus a small JSON API.
//!
//! Every request re-runs the pipeline from the shared load cache. Loading and
//! the numeric work happen on the blocking pool so the async workers stay free.

use crate::cache::DataCache;
use crate::config::DashboardFileConfig;
use crate::correlation::{closing_price_table, correlation_matrix, CorrelationMatrix};
use crate::dashboard::{load_table, render_dashboard, DashboardRequest};
use crate::error::{DashboardError, Result};
use crate::export::{render_dashboard_html, render_error_html, HtmlOptions};
use crate::pipeline::CompanyView;
use crate::selector::CompanySelector;
use crate::types::Granularity;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state, passed to all handlers via `State`.
pub struct AppState {
    pub config: DashboardFileConfig,
    pub cache: Arc<DataCache>,
}

impl AppState {
    pub fn new(config: DashboardFileConfig) -> Arc<Self> {
        Self::with_cache(config, Arc::new(DataCache::new()))
    }

    pub fn with_cache(config: DashboardFileConfig, cache: Arc<DataCache>) -> Arc<Self> {
        Arc::new(Self { config, cache })
    }
}

/// Query string of the dashboard page: `?company=AAPL&freq=Quarterly`.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub company: Option<String>,
    pub freq: Option<String>,
}

impl DashboardQuery {
    fn into_request(self) -> Result<DashboardRequest> {
        Ok(DashboardRequest {
            company: self.company,
            granularity: parse_freq(self.freq.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FreqQuery {
    pub freq: Option<String>,
}

/// Blank or absent means "use the configured default".
fn parse_freq(freq: Option<&str>) -> Result<Option<Granularity>> {
    match freq.map(str::trim) {
        None | Some("") => Ok(None),
        Some(f) => f.parse().map(Some),
    }
}

fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::MissingFile { .. } => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failure on the dashboard page, rendered as the HTML error page.
#[derive(Debug)]
pub struct PageError(pub DashboardError);

impl From<DashboardError> for PageError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!("Dashboard render failed: {}", self.0);
        }
        (status, Html(render_error_html(&self.0))).into_response()
    }
}

/// Failure on an `/api` route, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!("API request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Run `f` against the state on the blocking pool.
async fn run_blocking<T, F>(state: Arc<AppState>, f: F) -> Result<T>
where
    F: FnOnce(&AppState) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| DashboardError::IoError(std::io::Error::other(e)))?
}

/// GET /: the dashboard page.
async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> std::result::Result<Html<String>, PageError> {
    let request = query.into_request()?;
    let dashboard =
        run_blocking(state, move |s| render_dashboard(&s.cache, &s.config, &request)).await?;
    Ok(Html(render_dashboard_html(&dashboard, &HtmlOptions::default())))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub ticker: String,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompaniesResponse {
    pub default: Option<String>,
    pub companies: Vec<CompanyInfo>,
}

/// GET /api/companies
async fn api_companies(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<CompaniesResponse>, ApiError> {
    let response = run_blocking(state, |s| {
        let table = load_table(&s.cache, &s.config)?;
        let selector = CompanySelector::from_table(&table);
        let companies = selector
            .tickers()
            .iter()
            .map(|ticker| {
                let range = table.date_range(ticker);
                CompanyInfo {
                    ticker: ticker.clone(),
                    rows: table.count_for(ticker),
                    first_date: range.map(|r| r.0),
                    last_date: range.map(|r| r.1),
                }
            })
            .collect();
        Ok(CompaniesResponse {
            default: selector.default_ticker().map(str::to_string),
            companies,
        })
    })
    .await?;
    Ok(Json(response))
}

/// GET /api/company/{ticker}?freq=
async fn api_company(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<FreqQuery>,
) -> std::result::Result<Json<CompanyView>, ApiError> {
    let granularity = parse_freq(query.freq.as_deref())?;
    let view = run_blocking(state, move |s| {
        let table = load_table(&s.cache, &s.config)?;
        let granularity = granularity.unwrap_or(s.config.analysis.default_frequency);
        CompanyView::build(&table, &ticker, granularity, &s.config.analysis.ma_windows)
    })
    .await?;
    Ok(Json(view))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CorrelationResponse {
    pub matrix: CorrelationMatrix,
    /// Dates shared by every company.
    pub rows: usize,
    /// Per-ticker dates excluded by the join.
    pub dropped: HashMap<String, usize>,
}

/// GET /api/correlation
async fn api_correlation(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<CorrelationResponse>, ApiError> {
    let response = run_blocking(state, |s| {
        let table = load_table(&s.cache, &s.config)?;
        let prices = closing_price_table(&table, &table.tickers_in_load_order())?;
        Ok(CorrelationResponse {
            matrix: correlation_matrix(&prices),
            rows: prices.len(),
            dropped: prices.dropped,
        })
    })
    .await?;
    Ok(Json(response))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/companies", get(api_companies))
        .route("/api/company/{ticker}", get(api_company))
        .route("/api/correlation", get(api_correlation))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard until Ctrl+C.
pub async fn serve(config: DashboardFileConfig) -> Result<()> {
    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = AppState::new(config);

    // Warm the cache; a failure here is reported again on every request.
    match run_blocking(Arc::clone(&state), |s| load_table(&s.cache, &s.config)).await {
        Ok(table) => info!("Data successfully loaded and cached! ({} records)", table.len()),
        Err(e) => warn!("Initial data load failed: {}", e),
    }

    let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, gracefully stopping"),
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
