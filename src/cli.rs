use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;

use crate::config::{AppConfig, RenderMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Check the lowest ticket price once and alert when it is at or below the threshold.
#[derive(Parser, Debug)]
#[command(name = "ticket-watcher", version, about)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(short, long)]
    pub config: Option<String>,

    /// How to obtain the page markup
    #[arg(long, value_enum)]
    pub render_mode: Option<RenderMode>,

    /// Alert threshold in EUR
    #[arg(long)]
    pub threshold: Option<Decimal>,

    /// Listing page to check
    #[arg(long)]
    pub url: Option<String>,

    /// Report the decision without updating the store or sending mail
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Command-line values win over every configuration source.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(mode) = self.render_mode {
            config.scraper.render_mode = mode;
        }
        if let Some(threshold) = self.threshold {
            config.target.threshold_eur = threshold;
        }
        if let Some(url) = &self.url {
            config.target.url = url.clone();
        }
    }
}
