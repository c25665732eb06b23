//! Best-effort webhook notifier. Failures are logged and swallowed; the
//! ingest pipeline never waits on or learns about dispatch outcomes.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use super::StatusAlert;

pub struct WebhookNotifier {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// POST the alert as JSON. `Ok(())` when no webhook is configured.
    pub async fn dispatch(&self, alert: &StatusAlert) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("notifications disabled (no NOTIFY_WEBHOOK_URL)");
            return Ok(());
        };

        self.client
            .post(url)
            .timeout(self.timeout)
            .json(alert)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }
}
