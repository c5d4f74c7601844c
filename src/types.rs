//! Core data types for the dashboard.

use crate::error::DashboardError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One trading day of price data for a single company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
    pub ticker: String,
}

impl PriceRecord {
    /// Create a record carrying only a closing price.
    pub fn new(ticker: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            ticker: ticker.into(),
        }
    }

    /// Attach open/high/low/volume values.
    pub fn with_ohlv(
        mut self,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        volume: Option<f64>,
    ) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self.volume = volume;
        self
    }
}

/// Every company's records, concatenated in load order.
///
/// Built once by the loader and shared read-only afterwards; views over it
/// copy what they need instead of mutating it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedTable {
    records: Vec<PriceRecord>,
}

impl CombinedTable {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct tickers present in the table.
    pub fn tickers(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.ticker.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Tickers in the order they first appear (i.e. file order).
    pub fn tickers_in_load_order(&self) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        for record in &self.records {
            if !seen.iter().any(|t| t == &record.ticker) {
                seen.push(record.ticker.clone());
            }
        }
        seen
    }

    pub fn contains_ticker(&self, ticker: &str) -> bool {
        self.records.iter().any(|r| r.ticker == ticker)
    }

    /// Iterate over the records of one company, in load order.
    pub fn iter_ticker<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a PriceRecord> + 'a {
        self.records.iter().filter(move |r| r.ticker == ticker)
    }

    /// Number of records for a company.
    pub fn count_for(&self, ticker: &str) -> usize {
        self.iter_ticker(ticker).count()
    }

    /// First and last date recorded for a company.
    pub fn date_range(&self, ticker: &str) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.iter_ticker(ticker).map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

/// A single dated observation; `None` means no value exists yet for that date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// A named, date-indexed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Build a series from parallel date and value slices.
    pub fn from_parts(name: impl Into<String>, dates: &[NaiveDate], values: &[Option<f64>]) -> Self {
        let points = dates
            .iter()
            .zip(values.iter())
            .map(|(&date, &value)| SeriesPoint::new(date, value))
            .collect();
        Self::new(name, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Values that are present, in order.
    pub fn present_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.value).collect()
    }

    /// Number of points with no value.
    pub fn missing_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    /// Last point that carries a value.
    pub fn last_present(&self) -> Option<SeriesPoint> {
        self.points.iter().rev().find(|p| p.value.is_some()).copied()
    }

    /// Drop the leading run of missing values.
    pub fn drop_leading_missing(&self) -> Series {
        let start = self
            .points
            .iter()
            .position(|p| p.value.is_some())
            .unwrap_or(self.points.len());
        Series::new(self.name.clone(), self.points[start..].to_vec())
    }

    /// Min and max over present values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = self.points.iter().filter_map(|p| p.value);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Calendar period over which closing prices are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Monthly => "Monthly",
            Granularity::Quarterly => "Quarterly",
            Granularity::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Granularity::Quarterly),
            "yearly" | "year" | "y" => Ok(Granularity::Yearly),
            _ => Err(DashboardError::InvalidGranularity(s.to_string())),
        }
    }
}
