//! Loading per-company price files into one combined table.

use crate::error::{DashboardError, Result};
use crate::types::{CombinedTable, PriceRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Reader, ReaderBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw CSV row with flexible column naming.
///
/// Any extra columns (e.g. a `Name` column carrying the ticker) are ignored;
/// the ticker always comes from the file name.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "datetime",
        alias = "Datetime"
    )]
    date: String,
    #[serde(alias = "Open", alias = "open", default)]
    open: Option<f64>,
    #[serde(alias = "High", alias = "high", default)]
    high: Option<f64>,
    #[serde(alias = "Low", alias = "low", default)]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "close", default)]
    close: Option<f64>,
    /// Used only when the file has no plain close column.
    #[serde(rename = "Adj Close", alias = "adj_close", alias = "Adj_Close", default)]
    adj_close: Option<f64>,
    #[serde(alias = "Volume", alias = "volume", alias = "vol", default)]
    volume: Option<f64>,
}

/// Data source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DataConfig {
    /// Date format string tried before the built-in list (e.g. "%Y-%m-%d").
    pub date_format: Option<String>,
    /// CSV delimiter. If None, the delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Skip malformed rows instead of failing the whole load.
    pub skip_invalid: bool,
}

/// Derive the company ticker from a file name: the part before the first `_`.
///
/// `AAPL_data.csv` yields `AAPL`. A name with no separator falls back to the
/// file stem, so `MSFT.csv` yields `MSFT`.
pub fn ticker_from_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    match base.split_once('_') {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => Path::new(base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(base)
            .to_string(),
    }
}

/// Detect the CSV delimiter by analyzing the first few lines of the file.
///
/// Picks the candidate that yields the same field count (at least 5) on every
/// sampled line, preferring more fields.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let reader = BufReader::new(File::open(path)?);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();

    if lines.is_empty() {
        return Ok(b',');
    }

    let delimiters = [b',', b'\t', b';', b'|'];
    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in &delimiters {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.as_bytes().iter().filter(|&&b| b == delim).count() + 1)
            .collect();

        let first_count = counts[0];
        if first_count >= 5 && counts.iter().all(|&c| c == first_count) && first_count > best_score
        {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with score {}",
        best_delimiter as char, best_score
    );
    Ok(best_delimiter)
}

/// Parse a date string, trying an explicit format first and then common ones.
///
/// Slash-separated dates are read month-first (`01/02/2017` is 2 January),
/// falling back to day-first only when that cannot be a valid date. Datetime
/// strings keep only their calendar date.
pub(crate) fn parse_date(s: &str, format: Option<&str>) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(fmt) = format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%d-%b-%Y",  // 15-Jan-2024
        "%d %b %Y",  // 15 Jan 2024
        "%b %d, %Y", // Jan 15, 2024
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

/// Turn deserialized CSV rows into price records tagged with `ticker`.
fn read_records<R: Read>(
    mut reader: Reader<R>,
    source: &str,
    ticker: &str,
    config: &DataConfig,
) -> Result<Vec<PriceRecord>> {
    let mut records = Vec::new();
    let mut seen_dates = HashSet::new();
    let mut skipped = 0;
    let mut duplicates = 0;

    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_num = idx + 1;

        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|row| row_to_record(row, ticker, config));

        let record = match parsed {
            Ok(record) => record,
            Err(reason) => {
                if config.skip_invalid {
                    debug!("Skipping row {} of {}: {}", row_num, source, reason);
                    skipped += 1;
                    continue;
                }
                return Err(DashboardError::MalformedRow {
                    file: source.to_string(),
                    row: row_num,
                    reason,
                });
            }
        };

        if !seen_dates.insert(record.date) {
            duplicates += 1;
            continue;
        }
        records.push(record);
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows in {}", skipped, source);
    }
    if duplicates > 0 {
        warn!("Removed {} duplicate dates in {}", duplicates, source);
    }

    if records.is_empty() {
        return Err(DashboardError::NoData);
    }

    Ok(records)
}

fn row_to_record(
    row: CsvRow,
    ticker: &str,
    config: &DataConfig,
) -> std::result::Result<PriceRecord, String> {
    let date = parse_date(&row.date, config.date_format.as_deref())
        .ok_or_else(|| format!("could not parse date '{}'", row.date))?;
    let close = row
        .close
        .or(row.adj_close)
        .ok_or_else(|| "missing close price".to_string())?;
    if !close.is_finite() {
        return Err(format!("non-finite close price {}", close));
    }

    Ok(PriceRecord::new(ticker, date, close).with_ohlv(row.open, row.high, row.low, row.volume))
}

/// Load one company's price file.
///
/// Rows keep their file order. A missing file is reported as
/// [`DashboardError::MissingFile`].
pub fn load_csv(
    path: impl AsRef<Path>,
    ticker: &str,
    config: &DataConfig,
) -> Result<Vec<PriceRecord>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DashboardError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    debug!("Loading {} from: {}", ticker, path.display());

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    read_records(reader, &path.display().to_string(), ticker, config)
}

/// Load one company's records from in-memory CSV text.
pub fn load_csv_from_str(content: &str, ticker: &str, config: &DataConfig) -> Result<Vec<PriceRecord>> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter.unwrap_or(b','))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    read_records(reader, "<memory>", ticker, config)
}

/// Load every company file under `base_path` into one combined table.
///
/// Files are read in the given order and their rows concatenated. The load is
/// all-or-nothing: the first missing or unreadable file aborts it.
pub fn load_all<S: AsRef<str>>(
    base_path: impl AsRef<Path>,
    files: &[S],
    config: &DataConfig,
) -> Result<CombinedTable> {
    let base_path = base_path.as_ref();
    if files.is_empty() {
        return Err(DashboardError::InvalidInput(
            "no company files configured".to_string(),
        ));
    }

    // At most one record per (ticker, date) across the whole load.
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    let mut records = Vec::new();
    for file_name in files {
        let file_name = file_name.as_ref();
        let ticker = ticker_from_file_name(file_name);
        let company_records = load_csv(base_path.join(file_name), &ticker, config)?;

        let before = company_records.len();
        let fresh: Vec<PriceRecord> = company_records
            .into_iter()
            .filter(|r| seen.insert((r.ticker.clone(), r.date)))
            .collect();
        if fresh.len() < before {
            warn!(
                "{}: dropped {} rows whose dates were already loaded for {}",
                file_name,
                before - fresh.len(),
                ticker
            );
        }
        debug!("{}: {} records", ticker, fresh.len());
        records.extend(fresh);
    }

    let table = CombinedTable::new(records);
    info!(
        "Loaded {} records for {} companies from {}",
        table.len(),
        files.len(),
        base_path.display()
    );
    Ok(table)
}
