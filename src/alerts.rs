// Alert dispatch through the messaging gateway (GET ?phone=&text=&apikey=).
// Best-effort: one failed recipient is logged and the rest still get the message. No retries.

use crate::config::AlertsConfig;
use crate::models::GrowthAlert;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{instrument, warn};

/// Delivery tally for one alert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

pub struct AlertDispatcher {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
    recipients: Vec<String>,
    threshold_percent: Decimal,
}

impl AlertDispatcher {
    pub fn new(config: &AlertsConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            api_key: config.api_key.clone(),
            recipients: config.recipients.clone(),
            threshold_percent: config.threshold_percent,
        })
    }

    pub fn message(&self, alert: &GrowthAlert) -> String {
        alert.message(self.threshold_percent)
    }

    #[instrument(skip(self, alert), fields(server = %alert.server_alias, label = %alert.label))]
    pub async fn dispatch(&self, alert: &GrowthAlert) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if self.recipients.is_empty() {
            tracing::debug!("no alert recipients configured");
            return summary;
        }
        let text = self.message(alert);
        for phone in &self.recipients {
            match self.send(phone, &text).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(error = %e, recipient = %phone, "alert notification failed");
                }
            }
        }
        summary
    }

    // Errors are stripped of their URL: it carries the API key.
    async fn send(&self, phone: &str, text: &str) -> Result<(), reqwest::Error> {
        self.client
            .get(&self.gateway_url)
            .query(&[
                ("phone", phone),
                ("text", text),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        Ok(())
    }
}
