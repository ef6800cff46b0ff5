use crate::config::{MailCredentials, SmtpConfig};
use crate::plugins::trackers::price::{ChangeType, PriceTracker};
use crate::plugins::traits::{NotificationResult, NotifierPlugin, PriceAlert};
use crate::Result;
use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EmailNotifier {
    config: SmtpConfig,
}

impl EmailNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        EmailNotifier { config }
    }

    fn format_subject(&self, alert: &PriceAlert) -> String {
        format!(
            "Price Alert! {} ticket is now {}",
            alert.event_name,
            PriceTracker::format(alert.price)
        )
    }

    fn format_text_body(&self, alert: &PriceAlert) -> String {
        let mut text = format!(
            "The lowest price for the {} ticket is now {}, which is at or below your threshold of {}.\n",
            alert.event_name,
            PriceTracker::format(alert.price),
            PriceTracker::format(alert.threshold),
        );

        if let (Some(last), Some(change)) = (alert.last_price, alert.change) {
            if change != ChangeType::Unchanged {
                text.push_str(&format!(
                    "Previous check: {} ({}).\n",
                    PriceTracker::format(last),
                    change
                ));
            }
        }

        text.push_str(&format!("\nCheck it out now: {}\n", alert.url));
        text.push_str(&format!(
            "\nObserved at {} UTC\n",
            alert.observed_at_utc.format("%Y-%m-%d %H:%M:%S")
        ));
        text
    }

    fn build_message(&self, creds: &MailCredentials<'_>, alert: &PriceAlert) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, creds.sender).parse()?;
        let to: Mailbox = creds.recipient.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(self.format_subject(alert))
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.format_text_body(alert))?;

        Ok(email)
    }
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn plugin_type(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, alert: &PriceAlert) -> Result<NotificationResult> {
        let Some(creds) = self.config.credentials() else {
            return Ok(NotificationResult::Skipped {
                reason: "email credentials are not set".to_string(),
            });
        };

        let email = self.build_message(&creds, alert)?;
        let credentials = Credentials::new(creds.sender.to_string(), creds.password.to_string());

        // Implicit TLS, port 465 by default
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
            .port(self.config.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        let response = mailer.send(email).await?;
        info!(code = %response.code(), "Email alert sent");

        Ok(NotificationResult::Sent {
            message_id: Some(format!("email-{}", chrono::Utc::now().timestamp())),
        })
    }
}
