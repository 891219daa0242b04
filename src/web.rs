use botmonitor::app;
use botmonitor::config::ReportConfig;
use clap::Parser;
use log::info;
use std::path::PathBuf;

/// Serve the case report as JSON, CSV and XLSX
#[derive(Parser, Debug)]
#[command(name = "website")]
struct Args {
    /// JSON config file (defaults are used when omitted)
    #[arg(long, env = "BOTMONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides the config file
    #[arg(long)]
    listen: Option<String>,

    /// Directory of `<table>.csv` log exports, overrides the config file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ReportConfig::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }

    info!(
        "Starting report server for table {} in {}",
        config.events_table,
        config.log_dir.display()
    );
    app::run(config).await
}
