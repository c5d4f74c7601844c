//! Performance benchmarks for the dashboard pipeline.
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockdash::correlation::{closing_price_table, correlation_matrix};
use stockdash::dashboard::Dashboard;
use stockdash::export::{render_dashboard_html, HtmlOptions};
use stockdash::indicators::{pct_change, resample_mean, rolling_mean};
use stockdash::types::{CombinedTable, Granularity, PriceRecord, SeriesPoint};

const TICKERS: [&str; 4] = ["AAPL", "AMZN", "GOOG", "MSFT"];

/// Generate synthetic closes for benchmarking.
fn generate_closes(count: usize, seed: f64) -> Vec<f64> {
    let mut price = 100.0 * seed;
    (0..count)
        .map(|i| {
            let noise = ((i as f64 * 0.7 + seed).sin() * 2.0 + (i as f64 * 1.3).cos()) * 0.5;
            price += 0.001 * price + noise;
            price = price.max(10.0);
            price
        })
        .collect()
}

/// Roughly five years of daily rows for each of the four companies.
fn generate_table(days: usize) -> CombinedTable {
    let start = NaiveDate::from_ymd_opt(2013, 2, 8).unwrap();
    let mut records = Vec::with_capacity(days * TICKERS.len());
    for (i, ticker) in TICKERS.iter().enumerate() {
        for (t, close) in generate_closes(days, (i + 1) as f64).into_iter().enumerate() {
            records.push(PriceRecord::new(*ticker, start + Duration::days(t as i64), close));
        }
    }
    CombinedTable::new(records)
}

fn bench_indicators(c: &mut Criterion) {
    let closes = generate_closes(1259, 1.0);
    let values: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();

    let mut group = c.benchmark_group("indicators");
    for window in [10, 20, 50].iter() {
        group.bench_with_input(BenchmarkId::new("rolling_mean", window), window, |b, &w| {
            b.iter(|| rolling_mean(black_box(&values), w))
        });
    }
    group.bench_function("pct_change", |b| b.iter(|| pct_change(black_box(&closes))));

    let start = NaiveDate::from_ymd_opt(2013, 2, 8).unwrap();
    let points: Vec<SeriesPoint> = closes
        .iter()
        .enumerate()
        .map(|(t, c)| SeriesPoint::new(start + Duration::days(t as i64), Some(*c)))
        .collect();
    for granularity in Granularity::ALL {
        group.bench_with_input(
            BenchmarkId::new("resample_mean", granularity),
            &granularity,
            |b, &g| b.iter(|| resample_mean(black_box(&points), g)),
        );
    }
    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let table = generate_table(1259);
    c.bench_function("correlation_matrix", |b| {
        b.iter(|| {
            let prices = closing_price_table(black_box(&table), &TICKERS).unwrap();
            correlation_matrix(&prices)
        })
    });
}

fn bench_dashboard(c: &mut Criterion) {
    let table = generate_table(1259);
    let mut group = c.benchmark_group("dashboard");
    group.sample_size(20);

    group.bench_function("build", |b| {
        b.iter(|| Dashboard::build(black_box(&table), Some("GOOG"), Granularity::Monthly, &[10, 20, 50]))
    });

    let dashboard = Dashboard::build(&table, Some("GOOG"), Granularity::Monthly, &[10, 20, 50]).unwrap();
    group.bench_function("render_html", |b| {
        b.iter(|| render_dashboard_html(black_box(&dashboard), &HtmlOptions::default()))
    });
    group.finish();
}

criterion_group!(benches, bench_indicators, bench_correlation, bench_dashboard);
criterion_main!(benches);
