//! Cross-company correlation of closing prices.
//!
//! Companies are aligned on date with an inner join before correlating, so a
//! row always pairs prices from the same trading day. An earlier positional
//! alignment (row `i` of each company paired regardless of date) silently
//! produced wrong coefficients whenever companies had different trading-day
//! sets; dates not shared by every company are now dropped and reported.

use crate::error::{DashboardError, Result};
use crate::indicators::pearson;
use crate::types::CombinedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Closing prices for several companies on the dates they all share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePriceTable {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// One column per ticker, in `tickers` order, each `dates.len()` long.
    pub columns: Vec<Vec<f64>>,
    /// Rows of each ticker that had no partner on some other ticker.
    pub dropped: HashMap<String, usize>,
}

impl ClosePriceTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        let idx = self.tickers.iter().position(|t| t == ticker)?;
        Some(&self.columns[idx])
    }
}

/// Build the date-aligned closing price table for `tickers`.
pub fn closing_price_table<S: AsRef<str>>(
    table: &CombinedTable,
    tickers: &[S],
) -> Result<ClosePriceTable> {
    if tickers.is_empty() {
        return Err(DashboardError::InvalidInput(
            "correlation needs at least one company".to_string(),
        ));
    }

    let mut by_ticker: Vec<BTreeMap<NaiveDate, f64>> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.as_ref();
        let closes: BTreeMap<NaiveDate, f64> =
            table.iter_ticker(ticker).map(|r| (r.date, r.close)).collect();
        if closes.is_empty() {
            return Err(DashboardError::UnknownCompany(ticker.to_string()));
        }
        by_ticker.push(closes);
    }

    let mut shared: BTreeSet<NaiveDate> = by_ticker[0].keys().copied().collect();
    for closes in &by_ticker[1..] {
        shared.retain(|date| closes.contains_key(date));
    }
    let dates: Vec<NaiveDate> = shared.into_iter().collect();

    let mut dropped = HashMap::new();
    let mut columns = Vec::with_capacity(tickers.len());
    for (ticker, closes) in tickers.iter().zip(&by_ticker) {
        let ticker = ticker.as_ref();
        let lost = closes.len() - dates.len();
        if lost > 0 {
            warn!(
                "{}: {} of {} dates not shared by every company, excluded from correlation",
                ticker,
                lost,
                closes.len()
            );
        }
        dropped.insert(ticker.to_string(), lost);
        columns.push(dates.iter().map(|d| closes[d]).collect());
    }

    debug!("Aligned {} companies on {} shared dates", tickers.len(), dates.len());

    Ok(ClosePriceTable {
        tickers: tickers.iter().map(|t| t.as_ref().to_string()).collect(),
        dates,
        columns,
        dropped,
    })
}

/// Square Pearson correlation matrix keyed by ticker on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    /// `values[i][j]` is the correlation of `tickers[i]` with `tickers[j]`;
    /// `None` where a column is degenerate.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        self.values[i][j]
    }

    pub fn size(&self) -> usize {
        self.tickers.len()
    }
}

/// Pairwise Pearson correlation of every column in `prices`.
pub fn correlation_matrix(prices: &ClosePriceTable) -> CorrelationMatrix {
    let n = prices.tickers.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        for j in i..n {
            let r = pearson(&prices.columns[i], &prices.columns[j]);
            // The self-correlation of a non-degenerate column is exactly 1.
            let r = if i == j { r.map(|_| 1.0) } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        tickers: prices.tickers.clone(),
        values,
    }
}
