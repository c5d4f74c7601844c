//! End-to-end tests: CSV files on disk through to the rendered page.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use stockdash::cache::DataCache;
use stockdash::config::DashboardFileConfig;
use stockdash::correlation::{closing_price_table, correlation_matrix};
use stockdash::dashboard::{render_dashboard, DashboardRequest, DashboardSummary};
use stockdash::data::{load_all, DataConfig};
use stockdash::error::DashboardError;
use stockdash::export::{render_dashboard_html, HtmlOptions};
use stockdash::pipeline::CompanyView;
use stockdash::types::Granularity;

const FILES: [&str; 4] = ["AAPL_data.csv", "AMZN_data.csv", "GOOG_data.csv", "MSFT_data.csv"];

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Write a company file in the S&P 5-year layout.
fn write_company(dir: &Path, file: &str, rows: &[(NaiveDate, f64)]) {
    let ticker = file.split('_').next().unwrap();
    let mut csv = String::from("date,open,high,low,close,volume,Name\n");
    for (date, close) in rows {
        csv.push_str(&format!(
            "{},{o:.4},{h:.4},{l:.4},{close:.4},{v},{ticker}\n",
            date,
            o = close - 0.5,
            h = close + 1.0,
            l = close - 1.0,
            v = 1_000_000,
        ));
    }
    fs::write(dir.join(file), csv).unwrap();
}

/// Synthetic trading days: weekdays from 2016-01-04.
fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut date = d(2016, 1, 4);
    while days.len() < n {
        if chrono::Datelike::weekday(&date).number_from_monday() <= 5 {
            days.push(date);
        }
        date = date.succ_opt().unwrap();
    }
    days
}

fn create_dataset(days: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let dates = trading_days(days);
    for (i, file) in FILES.iter().enumerate() {
        let base = 50.0 * (i + 1) as f64;
        let rows: Vec<_> = dates
            .iter()
            .enumerate()
            .map(|(t, date)| {
                let t = t as f64;
                (*date, base + t * 0.1 * (i + 1) as f64 + ((t + i as f64) * 0.3).sin() * 3.0)
            })
            .collect();
        write_company(dir.path(), file, &rows);
    }
    dir
}

fn config_for(dir: &TempDir) -> DashboardFileConfig {
    let mut config = DashboardFileConfig::default();
    config.data.path = dir.path().display().to_string();
    config
}

#[test]
fn test_load_tags_rows_with_ticker() {
    let dir = create_dataset(30);
    let table = load_all(dir.path(), &FILES, &DataConfig::default()).unwrap();

    assert_eq!(table.len(), 120);
    assert_eq!(table.tickers(), vec!["AAPL", "AMZN", "GOOG", "MSFT"]);
    for ticker in table.tickers() {
        assert_eq!(table.count_for(&ticker), 30);
    }
    // Each file's rows land contiguously, in file order.
    assert_eq!(table.records()[0].ticker, "AAPL");
    assert_eq!(table.records()[30].ticker, "AMZN");
    assert_eq!(table.records()[119].ticker, "MSFT");
    assert!(table.records()[0].volume.is_some());
}

#[test]
fn test_cache_serves_without_rereading() {
    let dir = create_dataset(20);
    let config = config_for(&dir);
    let cache = DataCache::new();

    let first = render_dashboard(&cache, &config, &DashboardRequest::default()).unwrap();
    for file in FILES {
        fs::remove_file(dir.path().join(file)).unwrap();
    }
    let second = render_dashboard(
        &cache,
        &config,
        &DashboardRequest {
            company: Some("GOOG".to_string()),
            granularity: Some(Granularity::Yearly),
        },
    )
    .unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(first.total_records, second.total_records);
    assert_eq!(second.selected, "GOOG");
}

#[test]
fn test_cache_shared_across_threads() {
    let dir = create_dataset(40);
    let config = Arc::new(config_for(&dir));
    let cache = Arc::new(DataCache::new());

    let handles: Vec<_> = ["AAPL", "AMZN", "GOOG", "MSFT"]
        .into_iter()
        .map(|ticker| {
            let cache = Arc::clone(&cache);
            let config = Arc::clone(&config);
            std::thread::spawn(move || {
                let request = DashboardRequest {
                    company: Some(ticker.to_string()),
                    granularity: None,
                };
                render_dashboard(&cache, &config, &request).unwrap().selected
            })
        })
        .collect();

    let selected: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(selected, vec!["AAPL", "AMZN", "GOOG", "MSFT"]);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_missing_file_aborts_whole_load() {
    let dir = create_dataset(10);
    fs::remove_file(dir.path().join("GOOG_data.csv")).unwrap();
    let config = config_for(&dir);
    let cache = DataCache::new();

    let err = render_dashboard(&cache, &config, &DashboardRequest::default()).unwrap_err();
    match &err {
        DashboardError::MissingFile { path } => assert!(path.ends_with("GOOG_data.csv")),
        other => panic!("expected MissingFile, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Error: File not found at "));
    assert!(cache.is_empty());
}

#[test]
fn test_five_days_monthly_resample() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<_> = (2..=6).zip([10.0, 11.0, 12.0, 13.0, 14.0]).map(|(day, c)| (d(2017, 1, day), c)).collect();
    write_company(dir.path(), "AAPL_data.csv", &rows);

    let table = load_all(dir.path(), &["AAPL_data.csv"], &DataConfig::default()).unwrap();
    let view = CompanyView::build(&table, "AAPL", Granularity::Monthly, &[10, 20, 50]).unwrap();

    assert_eq!(view.resampled.len(), 1);
    assert_eq!(view.resampled.points[0].date, d(2017, 1, 31));
    assert!((view.resampled.points[0].value.unwrap() - 12.0).abs() < 1e-9);

    // Fewer rows than any window: every moving average is missing.
    for ma in &view.moving_averages {
        assert!(ma.values.iter().all(Option::is_none));
    }
    assert_eq!(view.daily_return_pct[0], None);
    assert!((view.daily_return_pct[1].unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn test_unsorted_file_is_sorted_per_company() {
    let dir = TempDir::new().unwrap();
    write_company(
        dir.path(),
        "MSFT_data.csv",
        &[(d(2017, 3, 3), 30.0), (d(2017, 3, 1), 10.0), (d(2017, 3, 2), 20.0)],
    );

    let table = load_all(dir.path(), &["MSFT_data.csv"], &DataConfig::default()).unwrap();
    let view = CompanyView::build(&table, "MSFT", Granularity::Monthly, &[2]).unwrap();

    assert_eq!(view.dates, vec![d(2017, 3, 1), d(2017, 3, 2), d(2017, 3, 3)]);
    assert_eq!(view.moving_averages[0].values, vec![None, Some(15.0), Some(25.0)]);
    // The combined table keeps file order.
    assert_eq!(table.records()[0].date, d(2017, 3, 3));
}

#[test]
fn test_correlation_joins_on_date() {
    let dir = TempDir::new().unwrap();
    let days = trading_days(6);
    let rising: Vec<_> = days.iter().enumerate().map(|(i, d)| (*d, 10.0 + i as f64)).collect();
    write_company(dir.path(), "AAPL_data.csv", &rising);

    // AMZN skips the third day but otherwise tracks AAPL exactly.
    let partial: Vec<_> = rising
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, (d, c))| (*d, c * 2.0))
        .collect();
    write_company(dir.path(), "AMZN_data.csv", &partial);

    let table = load_all(dir.path(), &["AAPL_data.csv", "AMZN_data.csv"], &DataConfig::default()).unwrap();
    let prices = closing_price_table(&table, &["AAPL", "AMZN"]).unwrap();
    assert_eq!(prices.len(), 5);
    assert_eq!(prices.dropped["AAPL"], 1);

    let matrix = correlation_matrix(&prices);
    assert!((matrix.get("AAPL", "AMZN").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_malformed_row_policy() {
    let dir = create_dataset(5);
    let path = dir.path().join("AMZN_data.csv");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("not-a-date,1,1,1,1,1,AMZN\n");
    fs::write(&path, content).unwrap();

    let strict = load_all(dir.path(), &FILES, &DataConfig::default());
    assert!(matches!(strict, Err(DashboardError::MalformedRow { .. })));

    let lenient = DataConfig {
        skip_invalid: true,
        ..Default::default()
    };
    let table = load_all(dir.path(), &FILES, &lenient).unwrap();
    assert_eq!(table.count_for("AMZN"), 5);
}

#[test]
fn test_full_page_render() {
    let dir = create_dataset(80);
    let config = config_for(&dir);
    let cache = DataCache::new();

    let request = DashboardRequest {
        company: Some("AMZN".to_string()),
        granularity: Some(Granularity::Quarterly),
    };
    let dashboard = render_dashboard(&cache, &config, &request).unwrap();
    assert_eq!(dashboard.companies.len(), 4);
    assert_eq!(dashboard.correlation_rows, 80);

    let html = render_dashboard_html(&dashboard, &HtmlOptions::default());
    assert!(html.contains("Tech Stocks Analysis Dashboard"));
    assert!(html.contains("1. Closing Price of AMZN Over Time"));
    assert!(html.contains("3. Daily returns for AMZN"));
    assert!(html.contains("AMZN Quarterly Average Closing Price"));
    assert!(html.contains("Data successfully loaded and cached!"));
    assert_eq!(html.matches("<svg").count(), 5);

    let summary = DashboardSummary::from_dashboard(&dashboard);
    assert_eq!(summary.rows, 80);
    assert_eq!(summary.moving_averages.len(), 3);
    assert!(summary.moving_averages.iter().all(|ma| ma.value.is_some()));
}

#[test]
fn test_unknown_company_is_rejected() {
    let dir = create_dataset(10);
    let config = config_for(&dir);
    let request = DashboardRequest {
        company: Some("TSLA".to_string()),
        granularity: None,
    };
    let err = render_dashboard(&DataCache::new(), &config, &request).unwrap_err();
    assert!(matches!(err, DashboardError::UnknownCompany(ref t) if t == "TSLA"));
    assert!(err.is_client_error());
}

#[test]
fn test_shared_ticker_files_agree_across_charts() {
    let dir = TempDir::new().unwrap();
    write_company(dir.path(), "AAPL_data.csv", &[(d(2020, 1, 2), 10.0), (d(2020, 1, 3), 20.0)]);
    write_company(dir.path(), "AAPL_extra.csv", &[(d(2020, 1, 2), 99.0)]);

    let table = load_all(dir.path(), &["AAPL_data.csv", "AAPL_extra.csv"], &DataConfig::default()).unwrap();
    assert_eq!(table.len(), 2);

    let view = CompanyView::build(&table, "AAPL", Granularity::Monthly, &[2]).unwrap();
    assert_eq!(view.dates, vec![d(2020, 1, 2), d(2020, 1, 3)]);
    assert_eq!(view.close, vec![10.0, 20.0]);
    assert!((view.resampled.points[0].value.unwrap() - 15.0).abs() < 1e-9);

    let prices = closing_price_table(&table, &["AAPL"]).unwrap();
    assert_eq!(prices.column("AAPL").unwrap(), &[10.0, 20.0]);
}

#[test]
fn test_yahoo_style_header_loads() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("MSFT_data.csv"),
        "Date,Open,High,Low,Close,Adj Close,Volume\n2020-01-02,158.78,160.73,158.33,160.62,156.59,22622100\n2020-01-03,158.32,159.95,158.06,158.62,154.64,21116200\n",
    )
    .unwrap();

    let table = load_all(dir.path(), &["MSFT_data.csv"], &DataConfig::default()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[0].close, 160.62);
}
