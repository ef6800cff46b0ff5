use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, TargetConfig};
use crate::extractor::{PriceExtractor, PriceSnapshot};
use crate::plugins::notifiers::EmailNotifier;
use crate::plugins::trackers::{ChangeType, PriceTracker};
use crate::plugins::traits::{NotificationResult, NotifierPlugin, PriceAlert};
use crate::scraper::{fetcher_for, PageFetcher};
use crate::store::{JsonBinStore, PriceStore};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    /// No valid current price; nothing was persisted or sent
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    NotNeeded,
    Sent,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub last_price: Option<Decimal>,
    pub current: Option<PriceSnapshot>,
    pub change: Option<ChangeType>,
    pub persisted: bool,
    pub alert: AlertStatus,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            outcome: RunOutcome::Completed,
            last_price: None,
            current: None,
            change: None,
            persisted: false,
            alert: AlertStatus::NotNeeded,
        }
    }

    pub fn current_price(&self) -> Option<Decimal> {
        self.current.as_ref().and_then(|s| s.lowest_price)
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// 0 when the run completed, 1 when it stopped without a price.
    pub fn exit_code(&self) -> i32 {
        if self.is_completed() { 0 } else { 1 }
    }
}

/// One price check: read last price, fetch and extract, persist, alert.
pub struct PriceMonitor {
    target: TargetConfig,
    tracker: PriceTracker,
    extractor: PriceExtractor,
    fetcher: Box<dyn PageFetcher>,
    store: Box<dyn PriceStore>,
    notifier: Box<dyn NotifierPlugin>,
    dry_run: bool,
}

impl PriceMonitor {
    pub fn new(
        target: TargetConfig,
        data_marker: &str,
        fetcher: Box<dyn PageFetcher>,
        store: Box<dyn PriceStore>,
        notifier: Box<dyn NotifierPlugin>,
    ) -> Self {
        Self {
            tracker: PriceTracker::new(target.threshold_eur),
            extractor: PriceExtractor::new(data_marker),
            target,
            fetcher,
            store,
            notifier,
            dry_run: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = fetcher_for(&config.scraper)?;
        let store = JsonBinStore::new(&config.store)?;
        let notifier = EmailNotifier::new(config.notifications.clone());

        Ok(Self::new(
            config.target.clone(),
            &config.scraper.data_marker,
            fetcher,
            Box::new(store),
            Box::new(notifier),
        ))
    }

    /// Skip persistence and notification; only report the decision.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        self.run_checked(run_id)
            .instrument(info_span!("price_check", %run_id))
            .await
    }

    async fn run_checked(&self, run_id: Uuid) -> RunReport {
        let mut report = RunReport::new(run_id);
        info!(
            url = %self.target.url,
            mode = ?self.fetcher.mode(),
            started_at = %report.started_at,
            "Running price check"
        );

        report.last_price = self.store.read_last().await;

        let snapshot = match self.current_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Could not retrieve the current price");
                report.outcome = RunOutcome::Aborted {
                    reason: e.to_string(),
                };
                info!("Price check finished (with errors)");
                return report;
            }
        };
        report.current = Some(snapshot.clone());

        let Some(current) = snapshot.lowest_price else {
            warn!(
                listings = snapshot.total_listings,
                "Could not find any available tickets to determine a price"
            );
            report.outcome = RunOutcome::Aborted {
                reason: "no available tickets".to_string(),
            };
            info!("Price check finished (with errors)");
            return report;
        };
        info!(price = %PriceTracker::format(current), "Lowest price found");

        if let Some(last) = report.last_price {
            let comparison = self.tracker.compare(last, current);
            match comparison.change_type {
                ChangeType::Unchanged => info!(
                    price = %PriceTracker::format(current),
                    "Price has not changed since the last check"
                ),
                change => info!(
                    previous = %PriceTracker::format(last),
                    current = %PriceTracker::format(current),
                    percent = ?comparison.percent_change,
                    "Price has {}", change
                ),
            }
            report.change = Some(comparison.change_type);
        }

        if self.dry_run {
            info!("Dry run, not updating stored price");
        } else {
            report.persisted = self.store.write_last(current).await;
        }

        let threshold = self.tracker.threshold();
        if self.tracker.meets_threshold(current) {
            info!(
                price = %PriceTracker::format(current),
                threshold = %PriceTracker::format(threshold),
                "Price is at or below the threshold"
            );
            let alert = PriceAlert {
                event_name: self.target.event_name.clone(),
                url: self.target.url.clone(),
                price: current,
                threshold,
                last_price: report.last_price,
                change: report.change,
                observed_at_utc: snapshot.observed_at_utc,
            };
            report.alert = self.dispatch(&alert).await;
        } else {
            info!(
                price = %PriceTracker::format(current),
                threshold = %PriceTracker::format(threshold),
                "Price is above the threshold, no alert sent"
            );
        }

        info!("Price check finished");
        report
    }

    async fn current_snapshot(&self) -> Result<PriceSnapshot> {
        let markup = self.fetcher.fetch(&self.target.url).await?;
        Ok(self.extractor.extract(&markup)?)
    }

    async fn dispatch(&self, alert: &PriceAlert) -> AlertStatus {
        if self.dry_run {
            return AlertStatus::Skipped {
                reason: "dry run".to_string(),
            };
        }

        match self.notifier.notify(alert).await {
            Ok(NotificationResult::Sent { message_id }) => {
                info!(notifier = self.notifier.plugin_type(), ?message_id, "Alert sent");
                AlertStatus::Sent
            }
            Ok(NotificationResult::Skipped { reason }) => {
                info!(notifier = self.notifier.plugin_type(), %reason, "Skipping alert");
                AlertStatus::Skipped { reason }
            }
            Err(e) => {
                warn!(notifier = self.notifier.plugin_type(), error = %e, "Failed to send alert");
                AlertStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
