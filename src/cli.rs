//! Command-line interface for the stock dashboard.

use stockdash::cache::DataCache;
use stockdash::config::DashboardFileConfig;
use stockdash::dashboard::{load_table, render_dashboard, DashboardRequest, DashboardSummary};
use stockdash::error::Result;
use stockdash::export::export_dashboard_html;
use stockdash::selector::CompanySelector;
use stockdash::server;
use stockdash::types::{CombinedTable, Granularity};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Stockdash - technical analysis dashboard for tech stocks.
#[derive(Parser)]
#[command(name = "stockdash")]
#[command(version)]
#[command(about = "Tech stock dashboard: moving averages, returns, resampling and correlation")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the interactive dashboard over HTTP
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Render the dashboard page to a static HTML file
    Render {
        /// Company ticker (defaults to the first in sorted order)
        #[arg(long)]
        company: Option<String>,

        /// Resample frequency
        #[arg(short, long, value_enum)]
        freq: Option<FreqArg>,

        /// Output file
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
    },

    /// Print the key numbers behind the dashboard
    Summary {
        /// Company ticker (defaults to the first in sorted order)
        #[arg(long)]
        company: Option<String>,

        /// Resample frequency
        #[arg(short, long, value_enum)]
        freq: Option<FreqArg>,
    },

    /// List the loaded companies
    Companies,

    /// Load every configured file and report what was found
    Validate,

    /// Create an example configuration file
    Init {
        /// Output path for config file
        #[arg(long, default_value = "stockdash.toml")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum FreqArg {
    Monthly,
    Quarterly,
    Yearly,
}

impl From<FreqArg> for Granularity {
    fn from(f: FreqArg) -> Self {
        match f {
            FreqArg::Monthly => Granularity::Monthly,
            FreqArg::Quarterly => Granularity::Quarterly,
            FreqArg::Yearly => Granularity::Yearly,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level.
    ///
    /// `RUST_LOG`, when set, takes precedence over `-v`.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let result = match EnvFilter::try_from_default_env() {
            Ok(filter) => tracing::subscriber::set_global_default(
                FmtSubscriber::builder()
                    .with_env_filter(filter)
                    .with_target(false)
                    .finish(),
            ),
            Err(_) => tracing::subscriber::set_global_default(
                FmtSubscriber::builder()
                    .with_max_level(level)
                    .with_target(false)
                    .finish(),
            ),
        };
        if let Err(e) = result {
            eprintln!("Failed to set tracing subscriber: {}", e);
        }
    }

    fn load_config(&self) -> Result<DashboardFileConfig> {
        DashboardFileConfig::load_or_default(self.config.as_deref())
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Serve { bind, port } => {
            let mut config = cli.load_config()?;
            if let Some(bind) = bind {
                config.server.bind = bind.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            config.validate()?;
            println!(
                "Serving dashboard on http://{}:{} (Ctrl+C to stop)",
                config.server.bind, config.server.port
            );
            tokio::runtime::Runtime::new()?.block_on(server::serve(config))
        }

        Commands::Render { company, freq, out } => {
            let config = cli.load_config()?;
            run_render(&config, company.clone(), *freq, out)
        }

        Commands::Summary { company, freq } => {
            let config = cli.load_config()?;
            run_summary(&config, company.clone(), *freq, cli.output)
        }

        Commands::Companies => {
            let config = cli.load_config()?;
            list_companies(&config, cli.output)
        }

        Commands::Validate => {
            let config = cli.load_config()?;
            validate_data(&config, cli.output)
        }

        Commands::Init { output } => init_config(output),
    }
}

fn request(company: Option<String>, freq: Option<FreqArg>) -> DashboardRequest {
    DashboardRequest {
        company,
        granularity: freq.map(Granularity::from),
    }
}

fn run_render(
    config: &DashboardFileConfig,
    company: Option<String>,
    freq: Option<FreqArg>,
    out: &PathBuf,
) -> Result<()> {
    let cache = DataCache::new();
    let dashboard = render_dashboard(&cache, config, &request(company, freq))?;
    export_dashboard_html(&dashboard, out)?;
    println!(
        "Dashboard for {} ({}) written to {}",
        dashboard.selected,
        dashboard.granularity,
        out.display()
    );
    Ok(())
}

fn run_summary(
    config: &DashboardFileConfig,
    company: Option<String>,
    freq: Option<FreqArg>,
    output: OutputFormat,
) -> Result<()> {
    let cache = DataCache::new();
    let dashboard = render_dashboard(&cache, config, &request(company, freq))?;
    let summary = DashboardSummary::from_dashboard(&dashboard);

    match output {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn format_pct_change(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("+{:.2}%", v).green().to_string(),
        Some(v) if v < 0.0 => format!("{:.2}%", v).red().to_string(),
        Some(v) => format!("{:.2}%", v),
        None => "n/a".to_string(),
    }
}

fn print_summary(summary: &DashboardSummary) {
    println!();
    println!("{}", "═".repeat(60).blue());
    println!("{}", format!(" {} SUMMARY ", summary.ticker).bold().blue());
    println!("{}", "═".repeat(60).blue());
    println!();

    println!("{}", "Overview".bold().underline());
    println!("  Rows:            {:>12}", summary.rows);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("  Period:          {} to {}", first, last);
    }
    println!("  Last Close:      {:>12}", fmt_opt(summary.last_close));
    println!("  Last Return:     {:>12}", format_pct_change(summary.last_daily_return_pct));
    println!("  Mean Return:     {:>12}", format_pct_change(summary.mean_daily_return_pct));
    println!();

    println!("{}", "Moving Averages".bold().underline());
    let mut builder = Builder::new();
    builder.push_record(["Window", "Latest"]);
    for ma in &summary.moving_averages {
        builder.push_record([format!("{} days", ma.window), fmt_opt(ma.value)]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!();

    println!(
        "{}",
        format!("{} Average Closing Price", summary.granularity).bold().underline()
    );
    let mut builder = Builder::new();
    builder.push_record(["Period End", "Mean Close"]);
    for point in &summary.resampled.points {
        builder.push_record([point.date.to_string(), fmt_opt(point.value)]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!();

    println!(
        "{}",
        format!("Correlation of Closing Prices ({} shared days)", summary.correlation_rows)
            .bold()
            .underline()
    );
    let matrix = &summary.correlation;
    let mut builder = Builder::new();
    let mut header = vec![String::new()];
    header.extend(matrix.tickers.iter().cloned());
    builder.push_record(header);
    for (ticker, row) in matrix.tickers.iter().zip(&matrix.values) {
        let mut record = vec![ticker.clone()];
        record.extend(row.iter().map(|v| fmt_opt(*v)));
        builder.push_record(record);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!();

    println!("{}", "═".repeat(60).blue());
}

fn company_rows(table: &CombinedTable) -> Vec<(String, usize, String, String)> {
    CompanySelector::from_table(table)
        .tickers()
        .iter()
        .map(|ticker| {
            let (first, last) = table
                .date_range(ticker)
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .unwrap_or_default();
            (ticker.clone(), table.count_for(ticker), first, last)
        })
        .collect()
}

fn list_companies(config: &DashboardFileConfig, output: OutputFormat) -> Result<()> {
    let table = load_table(&DataCache::new(), config)?;
    let rows = company_rows(&table);

    match output {
        OutputFormat::Text => {
            println!("\nAvailable Companies:\n");
            for (ticker, count, _, _) in &rows {
                println!("  {} {:>6} rows", format!("{:<8}", ticker).bold(), count);
            }
            println!();
        }
        OutputFormat::Json => {
            let tickers: Vec<&String> = rows.iter().map(|r| &r.0).collect();
            println!("{}", serde_json::to_string_pretty(&tickers)?);
        }
    }
    Ok(())
}

fn validate_data(config: &DashboardFileConfig, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Text {
        println!("Validating data directory: {}", config.data.path);
    }

    let table = load_table(&DataCache::new(), config)?;
    let rows = company_rows(&table);

    match output {
        OutputFormat::Text => {
            let mut builder = Builder::new();
            builder.push_record(["Ticker", "Rows", "First Date", "Last Date"]);
            for (ticker, count, first, last) in &rows {
                builder.push_record([ticker.clone(), count.to_string(), first.clone(), last.clone()]);
            }
            println!("\n{}", builder.build().with(Style::rounded()));
            println!("\nTotal records: {}", table.len());
            println!("\nValidation: {}", "PASSED".green().bold());
        }
        OutputFormat::Json => {
            let companies: Vec<_> = rows
                .iter()
                .map(|(ticker, count, first, last)| {
                    json!({ "ticker": ticker, "rows": count, "first_date": first, "last_date": last })
                })
                .collect();
            let report = json!({
                "path": config.data.path,
                "total_records": table.len(),
                "companies": companies,
                "valid": true,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn init_config(output: &PathBuf) -> Result<()> {
    let example = DashboardFileConfig::example();
    fs::write(output, example)?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to point at your data, then run:");
    println!("  stockdash -c {} serve", output.display());
    Ok(())
}
