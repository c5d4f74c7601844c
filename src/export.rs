//! HTML rendering of the dashboard page.
//!
//! The page is self-contained: styles are inline and charts are inline SVG,
//! so the same output can be served over HTTP or written to a file.
//!
//! Layout, top to bottom:
//! - sidebar with the company selector and resample frequency radio group
//! - five chart sections with fixed headings
//! - footer note

use crate::dashboard::Dashboard;
use crate::error::{DashboardError, Result};
use crate::types::Granularity;
use crate::viz::{correlation_heatmap_svg, html_escape, line_chart_svg, HeatmapSvgConfig, LineChartConfig};
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Browser tab title.
const PAGE_TITLE: &str = "Stock Analysis Dashboard";
/// Main heading on the page.
const PAGE_HEADING: &str = "Tech Stocks Analysis Dashboard";
const FOOTER_NOTE: &str =
    "This dashboard provides basic technical analysis of major tech stocks using Rust.";

/// How the page's controls behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Form target for control changes; `None` renders the controls disabled
    /// (a static export has nothing to submit to).
    pub form_action: Option<String>,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            form_action: Some("/".to_string()),
        }
    }
}

impl HtmlOptions {
    pub fn static_export() -> Self {
        Self { form_action: None }
    }
}

/// Heading for the moving-average section, listing the configured windows.
fn moving_average_heading(windows: &[usize]) -> String {
    let list: Vec<String> = windows.iter().map(|w| w.to_string()).collect();
    format!("2. Moving Averages ({} days)", list.join(", "))
}

/// Render the full dashboard page.
pub fn render_dashboard_html(dashboard: &Dashboard, options: &HtmlOptions) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_dashboard(&mut html, dashboard, options);
    html
}

fn write_dashboard(html: &mut String, dashboard: &Dashboard, options: &HtmlOptions) -> fmt::Result {
    let company = html_escape(&dashboard.selected);
    let view = &dashboard.view;

    html.push_str(&html_header(PAGE_TITLE));
    writeln!(html, "<div class=\"layout\">")?;
    write_sidebar(html, dashboard, options)?;

    writeln!(html, "<main>")?;
    writeln!(html, "  <h1>{}</h1>", PAGE_HEADING)?;
    writeln!(
        html,
        "  <p class=\"status\">Data successfully loaded and cached! ({} records, {} companies)</p>",
        dashboard.total_records,
        dashboard.companies.len()
    )?;

    // 1. Closing price
    write_section(
        html,
        &format!("1. Closing Price of {} Over Time", company),
        &line_chart_svg(
            &[view.close_series()],
            &LineChartConfig::default().with_title(format!("{} closing prices over time", dashboard.selected)),
        ),
    )?;

    // 2. Moving averages
    write_section(
        html,
        &moving_average_heading(&dashboard.ma_windows),
        &line_chart_svg(
            &view.moving_average_series(),
            &LineChartConfig::default()
                .with_title(format!("{} closing prices with moving average", dashboard.selected)),
        ),
    )?;

    // 3. Daily returns
    write_section(
        html,
        &format!("3. Daily returns for {}", company),
        &line_chart_svg(
            &[view.daily_return_series()],
            &LineChartConfig::default().with_title("Daily return in %"),
        ),
    )?;

    // 4. Resampled close
    write_section(
        html,
        "4. Resampled Closing Price (Monthly, Quarterly, Yearly)",
        &line_chart_svg(
            &[view.resampled.clone()],
            &LineChartConfig::default().with_title(format!(
                "{} {} Average Closing Price",
                dashboard.selected, dashboard.granularity
            )),
        ),
    )?;

    // 5. Correlation heatmap
    let heatmap = correlation_heatmap_svg(&dashboard.correlation, &HeatmapSvgConfig::default());
    let caption = format!(
        "<p class=\"caption\">Pearson correlation over {} trading days shared by all companies.</p>",
        dashboard.correlation_rows
    );
    write_section(
        html,
        "5. Correlation of Closing Prices",
        &format!("{}\n{}", heatmap, caption),
    )?;

    writeln!(html, "  <hr>")?;
    writeln!(html, "  <p class=\"note\"><strong>Note:</strong> {}</p>", FOOTER_NOTE)?;
    writeln!(html, "</main>")?;
    writeln!(html, "</div>")?;
    html.push_str(html_footer());
    Ok(())
}

fn write_sidebar(html: &mut String, dashboard: &Dashboard, options: &HtmlOptions) -> fmt::Result {
    let disabled = if options.form_action.is_some() { "" } else { " disabled" };
    let action = options.form_action.as_deref().unwrap_or("#");

    writeln!(html, "<aside class=\"sidebar\">")?;
    writeln!(html, "  <h2>Choose a Company:</h2>")?;
    writeln!(
        html,
        "  <form method=\"get\" action=\"{}\" id=\"controls\">",
        html_escape(action)
    )?;
    writeln!(html, "    <label for=\"company\">Select a stock</label>")?;
    writeln!(
        html,
        "    <select name=\"company\" id=\"company\" onchange=\"this.form.submit()\"{}>",
        disabled
    )?;
    for ticker in &dashboard.companies {
        let selected = if *ticker == dashboard.selected { " selected" } else { "" };
        let ticker = html_escape(ticker);
        writeln!(html, "      <option value=\"{0}\"{1}>{0}</option>", ticker, selected)?;
    }
    writeln!(html, "    </select>")?;

    writeln!(html, "    <fieldset>")?;
    writeln!(html, "      <legend>Select Resample Frequency</legend>")?;
    for granularity in Granularity::ALL {
        let checked = if granularity == dashboard.granularity { " checked" } else { "" };
        writeln!(
            html,
            "      <label><input type=\"radio\" name=\"freq\" value=\"{0}\" onchange=\"this.form.submit()\"{1}{2}> {0}</label>",
            granularity, checked, disabled
        )?;
    }
    writeln!(html, "    </fieldset>")?;
    writeln!(html, "    <noscript><button type=\"submit\"{}>Update</button></noscript>", disabled)?;
    writeln!(html, "  </form>")?;
    writeln!(html, "</aside>")
}

fn write_section(html: &mut String, heading: &str, body: &str) -> fmt::Result {
    writeln!(html, "  <section class=\"section\">")?;
    writeln!(html, "    <h3>{}</h3>", heading)?;
    writeln!(html, "{}", body)?;
    writeln!(html, "  </section>")
}

/// Render the page shown in place of the dashboard when a render fails.
pub fn render_error_html(error: &DashboardError) -> String {
    let mut html = html_header(PAGE_TITLE);
    html.push_str("<main>\n");
    html.push_str(&format!("  <h1>{}</h1>\n", PAGE_HEADING));
    html.push_str(&format!(
        "  <div class=\"error\" role=\"alert\">{}</div>\n",
        html_escape(&error.to_string())
    ));
    html.push_str("</main>\n");
    html.push_str(html_footer());
    html
}

/// Write a self-contained dashboard page to `path`.
pub fn export_dashboard_html(dashboard: &Dashboard, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let html = render_dashboard_html(dashboard, &HtmlOptions::static_export());
    writer.write_all(html.as_bytes())?;
    writer.flush()?;

    info!("Wrote dashboard for {} to {}", dashboard.selected, path.display());
    Ok(())
}

fn html_header(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{}</title>
  <style>
    :root {{
      --bg-color: #ffffff;
      --text-color: #1a1a2e;
      --card-bg: #f8f9fa;
      --border-color: #e9ecef;
      --negative: #dc3545;
      --neutral: #6c757d;
      --accent: #007bff;
    }}
    * {{ box-sizing: border-box; margin: 0; padding: 0; }}
    body {{
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
      background: var(--bg-color);
      color: var(--text-color);
      line-height: 1.6;
    }}
    .layout {{ display: flex; min-height: 100vh; }}
    .sidebar {{
      width: 260px;
      flex-shrink: 0;
      padding: 2rem 1.25rem;
      background: var(--card-bg);
      border-right: 1px solid var(--border-color);
    }}
    .sidebar h2 {{ font-size: 1.1rem; margin-bottom: 1rem; }}
    .sidebar label {{ display: block; margin-bottom: 0.25rem; font-size: 0.9rem; }}
    .sidebar select {{ width: 100%; padding: 0.35rem; margin-bottom: 1.25rem; }}
    .sidebar fieldset {{ border: none; }}
    .sidebar legend {{ font-size: 0.9rem; margin-bottom: 0.5rem; }}
    main {{ flex: 1; padding: 2rem; max-width: 1200px; }}
    h1 {{
      font-size: 1.75rem;
      margin-bottom: 1rem;
      padding-bottom: 0.5rem;
      border-bottom: 2px solid var(--accent);
    }}
    h3 {{ font-size: 1.15rem; margin-bottom: 0.75rem; color: var(--accent); }}
    .section {{
      margin-bottom: 2rem;
      padding: 1.25rem;
      background: var(--card-bg);
      border-radius: 8px;
      border: 1px solid var(--border-color);
    }}
    .status {{ color: var(--neutral); margin-bottom: 1.5rem; }}
    .caption, .note {{ font-size: 0.85rem; color: var(--neutral); margin-top: 0.5rem; }}
    .error {{
      padding: 1rem;
      border-radius: 6px;
      border: 1px solid var(--negative);
      color: var(--negative);
      background: #fdecea;
    }}
    hr {{ border: none; border-top: 1px solid var(--border-color); margin: 1.5rem 0 0.5rem; }}
  </style>
</head>
<body>
"#,
        html_escape(title)
    )
}

fn html_footer() -> &'static str {
    "</body>\n</html>\n"
}
