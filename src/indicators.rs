//! Column transforms over closing prices.
//!
//! Every output keeps one slot per input row. A slot with no defined value
//! is `None`, never zero or a partial result.

use crate::error::{DashboardError, Result};
use crate::types::{Granularity, Series, SeriesPoint};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Trailing arithmetic mean over `window` consecutive values.
///
/// The first `window - 1` positions are `None`, as is any window that contains
/// a missing value.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(DashboardError::InvalidInput(
            "moving average window must be at least 1".to_string(),
        ));
    }

    let mut out = vec![None; values.len()];
    if values.len() < window {
        return Ok(out);
    }

    for end in (window - 1)..values.len() {
        let slice = &values[end + 1 - window..=end];
        let sum: Option<f64> = slice.iter().copied().sum();
        out[end] = sum.map(|s| s / window as f64);
    }
    Ok(out)
}

/// Percentage change from the previous row: `(x[t] - x[t-1]) / x[t-1] * 100`.
///
/// Row 0 has no predecessor and is `None`. A zero previous value also yields
/// `None` instead of an infinity.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }

    out.push(None);
    for pair in values.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        out.push(if prev != 0.0 {
            Some((curr - prev) / prev * 100.0)
        } else {
            None
        });
    }
    out
}

/// Last calendar day of the period containing `date`.
pub fn period_end(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let (year, last_month) = match granularity {
        Granularity::Monthly => (date.year(), date.month()),
        Granularity::Quarterly => (date.year(), ((date.month() - 1) / 3 + 1) * 3),
        Granularity::Yearly => (date.year(), 12),
    };
    last_day_of_month(year, last_month)
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Average the present values of `points` within each calendar period.
///
/// Each output point is labelled with its period-end date. Periods without
/// any present value are omitted rather than zero-filled. Output is sorted by
/// date regardless of input order.
pub fn resample_mean(points: &[SeriesPoint], granularity: Granularity) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for point in points {
        if let Some(value) = point.value {
            let entry = buckets
                .entry(period_end(point.date, granularity))
                .or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, (sum, count))| SeriesPoint::new(date, Some(sum / count as f64)))
        .collect()
}

/// Resample a named series, keeping its name.
pub fn resample_series(series: &Series, granularity: Granularity) -> Series {
    Series::new(series.name.clone(), resample_mean(&series.points, granularity))
}

/// Pearson correlation of two equal-length columns.
///
/// Returns `None` for fewer than two pairs or when either column has zero
/// variance. The result is clamped to [-1, 1] to absorb rounding.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let r = covariance / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
