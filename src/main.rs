use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ticket_watcher::cli::{Cli, LogFormat};
use ticket_watcher::{AppConfig, PriceMonitor};

/// Exit status when configuration cannot be loaded or is invalid.
const CONFIG_ERROR_EXIT: i32 = 2;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ticket_watcher=info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(CONFIG_ERROR_EXIT);
        }
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        std::process::exit(CONFIG_ERROR_EXIT);
    }

    info!(
        store = config.store.credentials().is_some(),
        email = config.notifications.credentials().is_some(),
        "Starting Ticket Watcher"
    );

    let monitor = PriceMonitor::from_config(&config)?.with_dry_run(cli.dry_run);
    let report = monitor.run().await;
    debug!(report = %serde_json::to_string(&report)?, "Run report");

    std::process::exit(report.exit_code());
}
