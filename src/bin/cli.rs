use botmonitor::bucket::BucketWidth;
use botmonitor::config::ReportConfig;
use botmonitor::dashboard::{self, Report, ReportRequest};
use botmonitor::downloader::{self, ExportLabels};
use botmonitor::source::CsvLogSource;
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use log::info;
use std::fs;
use std::path::PathBuf;

/// Output format for the printed report
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Cards and per-date table (default)
    Text,
    /// Full report as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "report")]
#[command(about = "Aggregate the case log into time buckets and export the report", long_about = None)]
struct Cli {
    /// JSON config file (defaults are used when omitted)
    #[arg(long, env = "BOTMONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of `<table>.csv` log exports, overrides the config file
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// First date of the report (YYYY-MM-DD), defaults to a week before yesterday
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date of the report (YYYY-MM-DD), defaults to yesterday
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Bucket width in minutes (15 or 30)
    #[arg(short, long, value_parser = parse_width)]
    width: Option<BucketWidth>,

    /// Fail on malformed timestamps instead of skipping the row
    #[arg(long)]
    strict: bool,

    /// Write the workbook to this path
    #[arg(long, value_name = "PATH")]
    xlsx: Option<PathBuf>,

    /// Write the bucket table as CSV to this path
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Print the latest notification instead of a report
    #[arg(long)]
    notification: bool,

    #[arg(long = "format", value_enum, default_value = "text")]
    format: OutputFormat,
}

fn parse_width(value: &str) -> Result<BucketWidth, String> {
    let minutes: u16 = value.parse().map_err(|e| format!("{}", e))?;
    BucketWidth::try_from(minutes).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = ReportConfig::load_or_default(cli.config.as_deref())?;
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }
    let source = CsvLogSource::new(config.log_dir.clone(), config.columns());

    if cli.notification {
        match dashboard::latest_notification(&source, &config)? {
            Some(notification) => println!("{}", notification),
            None => println!("No notification available"),
        }
        return Ok(());
    }

    let request = ReportRequest {
        start: cli.start,
        end: cli.end,
        width: cli.width,
        strict: cli.strict,
    };
    let report = dashboard::render(&source, &config, &request, Local::now().date_naive())?;

    let mut aggregator = config.aggregator();
    if let Some(width) = cli.width {
        aggregator.bucket_width = width;
    }
    let labels = ExportLabels::from_config(&aggregator);

    if let Some(path) = &cli.xlsx {
        fs::write(path, downloader::to_xlsx(&report.table, &labels)?)?;
        info!("wrote workbook to {}", path.display());
    }
    if let Some(path) = &cli.csv {
        fs::write(path, downloader::to_csv(&report.table, &labels))?;
        info!("wrote csv to {}", path.display());
    }

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, &labels),
    }

    Ok(())
}

fn print_report(report: &Report, labels: &ExportLabels) {
    println!(
        "{} to {} ({} minute buckets)",
        report.table.start(),
        report.table.end(),
        report.table.bucket_width().minutes()
    );
    println!("  {:<28} {}", "Total Cases:", report.cards.total);
    println!("  {:<28} {}", format!("{} Working Cases:", labels.primary), report.cards.primary);
    println!("  {:<28} {}", format!("Not {} Cases:", labels.primary), report.cards.non_primary);
    if report.table.skipped_rows() > 0 {
        println!("  {:<28} {}", "Skipped rows:", report.table.skipped_rows());
    }
    println!();

    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8}",
        "Date", "Total", &labels.primary, &labels.secondary, "%"
    );
    for day in &report.daily {
        println!(
            "{:<10} {:>8} {:>8} {:>8} {:>8.2}",
            downloader::sheet_date(day.date),
            day.totals.total_count,
            day.totals.primary_count,
            day.totals.secondary_count,
            day.totals.percentage
        );
    }
    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8.2}",
        "Total",
        report.summary.total_count,
        report.summary.primary_count,
        report.summary.secondary_count,
        report.summary.percentage
    );
}
