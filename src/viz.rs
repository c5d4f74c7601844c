//! SVG chart rendering.
//!
//! Charts are emitted as standalone `<svg>` strings so they can be inlined
//! into the dashboard page or written to disk:
//! - multi-series line charts over dates, with gaps where values are missing
//! - an annotated heatmap for the correlation matrix

use crate::correlation::CorrelationMatrix;
use crate::types::Series;
use chrono::NaiveDate;
use std::fmt::{self, Write};

/// Line colours, cycled per series.
const PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

const EMPTY_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#;

/// Escape text for inclusion in HTML or SVG.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Configuration for SVG line charts.
#[derive(Debug, Clone)]
pub struct LineChartConfig {
    pub width: usize,
    pub height: usize,
    /// Space reserved for axis labels.
    pub margin: usize,
    pub title: Option<String>,
    /// Number of horizontal grid lines / y-axis ticks.
    pub y_ticks: usize,
    /// Decimal places on y-axis labels.
    pub precision: usize,
}

impl Default for LineChartConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 320,
            margin: 60,
            title: None,
            y_ticks: 5,
            precision: 2,
        }
    }
}

impl LineChartConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Render one or more date-indexed series as an SVG line chart.
///
/// All series share the x (date) and y (value) axes. Missing values break
/// the line instead of dropping to zero.
pub fn line_chart_svg(series: &[Series], config: &LineChartConfig) -> String {
    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write_line_chart(&mut svg, series, config);
    svg
}

fn write_line_chart(svg: &mut String, series: &[Series], config: &LineChartConfig) -> fmt::Result {
    let dates = series.iter().flat_map(|s| s.points.iter().map(|p| p.date));
    let (min_date, max_date) = match min_max(dates) {
        Some(range) => range,
        None => return write_placeholder(svg, config, "No data"),
    };
    let values = series.iter().flat_map(|s| s.points.iter().filter_map(|p| p.value));
    let (min_val, max_val) = match min_max_f64(values) {
        Some(range) => range,
        None => return write_placeholder(svg, config, "No values to plot"),
    };

    let title_offset = if config.title.is_some() { 30.0 } else { 0.0 };
    let left = config.margin as f64;
    let right = config.width as f64 - 20.0;
    let top = 20.0 + title_offset;
    let bottom = config.height as f64 - 40.0;

    let day_span = (max_date - min_date).num_days().max(1) as f64;
    let (y_lo, y_hi) = if (max_val - min_val).abs() > f64::EPSILON {
        (min_val, max_val)
    } else {
        (min_val - 1.0, max_val + 1.0)
    };

    let x_of = |date: NaiveDate| left + (date - min_date).num_days() as f64 / day_span * (right - left);
    let y_of = |value: f64| bottom - (value - y_lo) / (y_hi - y_lo) * (bottom - top);

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="100%" preserveAspectRatio="xMidYMid meet" class="chart">"#,
        w = config.width,
        h = config.height
    )?;
    writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#)?;

    if let Some(title) = &config.title {
        writeln!(
            svg,
            r#"  <text x="{}" y="22" text-anchor="middle" font-family="sans-serif" font-size="15" font-weight="bold">{}</text>"#,
            config.width / 2,
            html_escape(title)
        )?;
    }

    // Grid and y-axis labels
    let ticks = config.y_ticks.max(2);
    for i in 0..ticks {
        let value = y_lo + (y_hi - y_lo) * i as f64 / (ticks - 1) as f64;
        let y = y_of(value);
        writeln!(
            svg,
            r#"  <line x1="{left:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="rgb(230,230,230)" stroke-width="1"/>"#
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="10">{:.*}</text>"#,
            left - 6.0,
            y + 3.0,
            config.precision,
            value
        )?;
    }

    // Axes
    writeln!(
        svg,
        r#"  <line x1="{left:.1}" y1="{bottom:.1}" x2="{right:.1}" y2="{bottom:.1}" stroke="black" stroke-width="1"/>"#
    )?;
    writeln!(
        svg,
        r#"  <line x1="{left:.1}" y1="{top:.1}" x2="{left:.1}" y2="{bottom:.1}" stroke="black" stroke-width="1"/>"#
    )?;

    // X-axis labels: first, middle and last date
    let mid_date = min_date + chrono::Duration::days((max_date - min_date).num_days() / 2);
    let mut x_labels = vec![min_date, mid_date, max_date];
    x_labels.dedup();
    for date in x_labels {
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="10">{}</text>"#,
            x_of(date),
            bottom + 16.0,
            date.format("%Y-%m-%d")
        )?;
    }

    // Series lines
    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let mut path = String::new();
        let mut pen_down = false;
        for point in &s.points {
            match point.value {
                Some(v) => {
                    let cmd = if pen_down { 'L' } else { 'M' };
                    write!(path, "{}{:.2},{:.2} ", cmd, x_of(point.date), y_of(v))?;
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }
        if !path.is_empty() {
            writeln!(
                svg,
                r#"  <path d="{}" fill="none" stroke="{}" stroke-width="1.5" data-series="{}"/>"#,
                path.trim_end(),
                color,
                html_escape(&s.name)
            )?;
        }
    }

    // Legend
    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let y = top + 4.0 + idx as f64 * 16.0;
        let x = right - 150.0;
        writeln!(
            svg,
            r#"  <rect x="{:.1}" y="{:.1}" width="12" height="3" fill="{}"/>"#,
            x,
            y,
            color
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11">{}</text>"#,
            x + 18.0,
            y + 5.0,
            html_escape(&s.name)
        )?;
    }

    writeln!(svg, "</svg>")
}

fn write_placeholder(svg: &mut String, config: &LineChartConfig, message: &str) -> fmt::Result {
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} 60" width="100%" class="chart">"#,
        w = config.width
    )?;
    writeln!(
        svg,
        r#"  <text x="{}" y="35" text-anchor="middle" font-family="sans-serif" font-size="13" fill="rgb(120,120,120)">{}</text>"#,
        config.width / 2,
        html_escape(message)
    )?;
    writeln!(svg, "</svg>")
}

fn min_max<T: Ord + Copy>(items: impl Iterator<Item = T>) -> Option<(T, T)> {
    items.fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
    })
}

fn min_max_f64(items: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    items
        .filter(|v| v.is_finite())
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
}

// ============================================================================
// Correlation Heatmap
// ============================================================================

/// Configuration for SVG heatmap generation.
#[derive(Debug, Clone)]
pub struct HeatmapSvgConfig {
    /// Cell width in pixels.
    pub cell_width: usize,
    /// Cell height in pixels.
    pub cell_height: usize,
    /// Margin around the heatmap in pixels.
    pub margin: usize,
    /// Color for the low end of the scale (RGB).
    pub color_low: (u8, u8, u8),
    /// Color for the middle of the scale (RGB).
    pub color_mid: (u8, u8, u8),
    /// Color for the high end of the scale (RGB).
    pub color_high: (u8, u8, u8),
    /// Value mapped to `color_low`.
    pub min_value: f64,
    /// Value mapped to `color_high`.
    pub max_value: f64,
    /// Whether to show value labels in cells.
    pub show_labels: bool,
    pub title: Option<String>,
}

impl Default for HeatmapSvgConfig {
    fn default() -> Self {
        // Coolwarm endpoints over the full correlation range.
        Self {
            cell_width: 90,
            cell_height: 60,
            margin: 70,
            color_low: (59, 76, 192),
            color_mid: (221, 221, 221),
            color_high: (180, 4, 38),
            min_value: -1.0,
            max_value: 1.0,
            show_labels: true,
            title: None,
        }
    }
}

/// Interpolate between two RGB colors.
fn interpolate_color(c1: (u8, u8, u8), c2: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);
    (
        (c1.0 as f64 + (c2.0 as f64 - c1.0 as f64) * t) as u8,
        (c1.1 as f64 + (c2.1 as f64 - c1.1 as f64) * t) as u8,
        (c1.2 as f64 + (c2.2 as f64 - c1.2 as f64) * t) as u8,
    )
}

/// Get color for a normalized value (0.0 = low, 0.5 = mid, 1.0 = high).
fn value_to_color(value: f64, config: &HeatmapSvgConfig) -> String {
    let (r, g, b) = if value < 0.5 {
        interpolate_color(config.color_low, config.color_mid, value * 2.0)
    } else {
        interpolate_color(config.color_mid, config.color_high, (value - 0.5) * 2.0)
    };
    format!("rgb({},{},{})", r, g, b)
}

/// Render a correlation matrix as an annotated SVG heatmap.
pub fn correlation_heatmap_svg(matrix: &CorrelationMatrix, config: &HeatmapSvgConfig) -> String {
    if matrix.size() == 0 {
        return EMPTY_SVG.to_string();
    }
    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write_heatmap(&mut svg, matrix, config);
    svg
}

fn write_heatmap(svg: &mut String, matrix: &CorrelationMatrix, config: &HeatmapSvgConfig) -> fmt::Result {
    let n = matrix.size();
    let grid_width = n * config.cell_width;
    let grid_height = n * config.cell_height;
    let legend_width = 60;
    let title_offset = if config.title.is_some() { 30 } else { 0 };
    let total_width = grid_width + 2 * config.margin + legend_width;
    let total_height = grid_height + 2 * config.margin + title_offset;
    let range = if (config.max_value - config.min_value).abs() > f64::EPSILON {
        config.max_value - config.min_value
    } else {
        1.0
    };

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" class="heatmap">"#,
        w = total_width,
        h = total_height
    )?;
    writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#)?;

    if let Some(title) = &config.title {
        writeln!(
            svg,
            r#"  <text x="{}" y="25" text-anchor="middle" font-family="sans-serif" font-size="16" font-weight="bold">{}</text>"#,
            total_width / 2,
            html_escape(title)
        )?;
    }

    let grid_top = config.margin + title_offset;
    for (row, row_values) in matrix.values.iter().enumerate() {
        for (col, &value) in row_values.iter().enumerate() {
            let cell_x = config.margin + col * config.cell_width;
            let cell_y = grid_top + row * config.cell_height;
            let normalized = value.map(|v| (v - config.min_value) / range);

            let fill = match normalized {
                Some(t) => value_to_color(t, config),
                None => "rgb(200,200,200)".to_string(),
            };
            writeln!(
                svg,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="rgb(255,255,255)" stroke-width="1"/>"#,
                cell_x, cell_y, config.cell_width, config.cell_height, fill
            )?;

            if config.show_labels {
                let label = match value {
                    Some(v) => format!("{:.2}", v),
                    None => "n/a".to_string(),
                };
                // Light text on the saturated ends of the scale.
                let text_color = match normalized {
                    Some(t) if !(0.25..=0.75).contains(&t) => "white",
                    _ => "black",
                };
                writeln!(
                    svg,
                    r#"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="13" fill="{}">{}</text>"#,
                    cell_x + config.cell_width / 2,
                    cell_y + config.cell_height / 2 + 5,
                    text_color,
                    label
                )?;
            }
        }
    }

    // Column labels below the grid, row labels to the left.
    for (i, ticker) in matrix.tickers.iter().enumerate() {
        writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="12">{}</text>"#,
            config.margin + i * config.cell_width + config.cell_width / 2,
            grid_top + grid_height + 18,
            html_escape(ticker)
        )?;
        writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="end" font-family="sans-serif" font-size="12">{}</text>"#,
            config.margin - 8,
            grid_top + i * config.cell_height + config.cell_height / 2 + 4,
            html_escape(ticker)
        )?;
    }

    // Colour scale bar
    let bar_x = config.margin + grid_width + 20;
    let steps = 20;
    let step_height = grid_height as f64 / steps as f64;
    for i in 0..steps {
        let t = 1.0 - (i as f64 + 0.5) / steps as f64;
        writeln!(
            svg,
            r#"  <rect x="{}" y="{:.1}" width="14" height="{:.1}" fill="{}"/>"#,
            bar_x,
            grid_top as f64 + i as f64 * step_height,
            step_height + 0.5,
            value_to_color(t, config)
        )?;
    }
    for (value, y) in [
        (config.max_value, grid_top + 4),
        (config.min_value, grid_top + grid_height),
    ] {
        writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-family="sans-serif" font-size="10">{:.1}</text>"#,
            bar_x + 18,
            y,
            value
        )?;
    }

    writeln!(svg, "</svg>")
}
