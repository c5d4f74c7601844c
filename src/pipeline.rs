//! Per-company transform pipeline.
//!
//! [`CompanyView::build`] narrows the combined table to one company, sorts it
//! by date and derives the moving-average, daily-return and resampled views
//! behind charts 1 to 4. The combined table itself is never modified.

use crate::error::{DashboardError, Result};
use crate::indicators::{pct_change, resample_mean, rolling_mean};
use crate::types::{CombinedTable, Granularity, PriceRecord, Series, SeriesPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Moving-average windows used when none are configured.
pub const DEFAULT_MA_WINDOWS: [usize; 3] = [10, 20, 50];

/// Name of the daily return column.
pub const DAILY_RETURN_COLUMN: &str = "Daily return in %";

/// Column name for a moving average of `window` days.
pub fn moving_average_column(window: usize) -> String {
    format!("close_{}", window)
}

/// A company's rows, sorted ascending by date, copied out of the combined table.
pub fn company_records(table: &CombinedTable, ticker: &str) -> Vec<PriceRecord> {
    let mut records: Vec<PriceRecord> = table.iter_ticker(ticker).cloned().collect();
    records.sort_by_key(|r| r.date);
    records
}

/// Moving average column attached to the working copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

/// Everything the per-company charts need, derived in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyView {
    pub ticker: String,
    pub granularity: Granularity,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub moving_averages: Vec<MovingAverage>,
    pub daily_return_pct: Vec<Option<f64>>,
    pub resampled: Series,
}

impl CompanyView {
    /// Filter, sort and augment one company's series.
    pub fn build(
        table: &CombinedTable,
        ticker: &str,
        granularity: Granularity,
        ma_windows: &[usize],
    ) -> Result<Self> {
        let records = company_records(table, ticker);
        if records.is_empty() {
            return Err(DashboardError::UnknownCompany(ticker.to_string()));
        }

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let close: Vec<f64> = records.iter().map(|r| r.close).collect();
        let close_opt: Vec<Option<f64>> = close.iter().copied().map(Some).collect();

        let moving_averages = ma_windows
            .iter()
            .map(|&window| {
                Ok(MovingAverage {
                    window,
                    values: rolling_mean(&close_opt, window)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let daily_return_pct = pct_change(&close);

        let close_points: Vec<SeriesPoint> = dates
            .iter()
            .zip(close_opt.iter())
            .map(|(&date, &value)| SeriesPoint::new(date, value))
            .collect();
        let resampled = Series::new("close", resample_mean(&close_points, granularity));

        debug!(
            "{}: {} rows, {} {} periods",
            ticker,
            dates.len(),
            resampled.len(),
            granularity
        );

        Ok(Self {
            ticker: ticker.to_string(),
            granularity,
            dates,
            close,
            moving_averages,
            daily_return_pct,
            resampled,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Chart 1: closing price indexed by date.
    pub fn close_series(&self) -> Series {
        let values: Vec<Option<f64>> = self.close.iter().copied().map(Some).collect();
        Series::from_parts("close", &self.dates, &values)
    }

    /// Moving average series for one window, if it was computed.
    pub fn moving_average(&self, window: usize) -> Option<Series> {
        self.moving_averages
            .iter()
            .find(|ma| ma.window == window)
            .map(|ma| Series::from_parts(moving_average_column(window), &self.dates, &ma.values))
    }

    /// Chart 2: close plus every moving average.
    pub fn moving_average_series(&self) -> Vec<Series> {
        let mut series = vec![self.close_series()];
        series.extend(
            self.moving_averages
                .iter()
                .map(|ma| Series::from_parts(moving_average_column(ma.window), &self.dates, &ma.values)),
        );
        series
    }

    /// Chart 3: daily return with the leading missing value dropped.
    pub fn daily_return_series(&self) -> Series {
        Series::from_parts(DAILY_RETURN_COLUMN, &self.dates, &self.daily_return_pct)
            .drop_leading_missing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Two companies, with MSFT rows deliberately out of order.
    fn table() -> CombinedTable {
        CombinedTable::new(vec![
            PriceRecord::new("AAPL", d(2018, 1, 2), 10.0),
            PriceRecord::new("AAPL", d(2018, 1, 3), 11.0),
            PriceRecord::new("AAPL", d(2018, 1, 4), 12.0),
            PriceRecord::new("AAPL", d(2018, 1, 5), 13.0),
            PriceRecord::new("AAPL", d(2018, 1, 8), 14.0),
            PriceRecord::new("MSFT", d(2018, 2, 1), 30.0),
            PriceRecord::new("MSFT", d(2018, 1, 31), 20.0),
        ])
    }

    #[test]
    fn test_company_records_sorted_without_mutating_table() {
        let table = table();
        let before = table.clone();
        let records = company_records(&table, "MSFT");

        assert_eq!(records.len(), 2);
        assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(table, before);
    }

    #[test]
    fn test_short_series_has_no_moving_averages() {
        let view = CompanyView::build(&table(), "AAPL", Granularity::Monthly, &DEFAULT_MA_WINDOWS)
            .unwrap();

        assert_eq!(view.len(), 5);
        for ma in &view.moving_averages {
            assert!(ma.values.iter().all(Option::is_none), "window {}", ma.window);
        }
        let ma10 = view.moving_average(10).unwrap();
        assert_eq!(ma10.name, "close_10");
        assert_eq!(ma10.missing_count(), 5);
    }

    #[test]
    fn test_daily_returns() {
        let view = CompanyView::build(&table(), "AAPL", Granularity::Monthly, &[2]).unwrap();
        assert_eq!(view.daily_return_pct[0], None);
        assert!((view.daily_return_pct[1].unwrap() - 10.0).abs() < 1e-9);

        let chart = view.daily_return_series();
        assert_eq!(chart.len(), 4);
        assert_eq!(chart.points[0].date, d(2018, 1, 3));
        assert_eq!(chart.name, DAILY_RETURN_COLUMN);
    }

    #[test]
    fn test_monthly_resample_is_mean_of_five_days() {
        let view = CompanyView::build(&table(), "AAPL", Granularity::Monthly, &[]).unwrap();
        assert_eq!(view.resampled.len(), 1);
        assert_eq!(view.resampled.points[0], SeriesPoint::new(d(2018, 1, 31), Some(12.0)));
    }

    #[test]
    fn test_resample_uses_sorted_rows() {
        let view = CompanyView::build(&table(), "MSFT", Granularity::Monthly, &[1]).unwrap();
        assert_eq!(view.dates, vec![d(2018, 1, 31), d(2018, 2, 1)]);
        assert_eq!(view.resampled.len(), 2);
        assert_eq!(view.resampled.points[1].value, Some(30.0));
        assert!((view.daily_return_pct[1].unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_chart_has_close_first() {
        let view = CompanyView::build(&table(), "AAPL", Granularity::Yearly, &[2, 3]).unwrap();
        let series = view.moving_average_series();
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["close", "close_2", "close_3"]);
        assert_eq!(series[1].points[1].value, Some(10.5));
    }

    #[test]
    fn test_unknown_company() {
        assert!(matches!(
            CompanyView::build(&table(), "GOOG", Granularity::Monthly, &DEFAULT_MA_WINDOWS),
            Err(DashboardError::UnknownCompany(_))
        ));
    }
}
