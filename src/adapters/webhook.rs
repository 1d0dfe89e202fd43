//! Webhook Notifier - Fire-and-Forget Lifecycle Events
//!
//! POSTs `{event, payload, ts}` to the configured webhook URL. Runs on
//! detached tasks after the primary operation committed; failures are
//! logged and swallowed, never retried, never surfaced to the caller.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::ports::notifier::{OrderEvent, OrderNotifier};

/// HTTP webhook sink. With no URL configured every event is dropped
/// silently, which keeps the service usable without a receiver.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    /// Build a notifier with a bounded request timeout so a slow
    /// receiver cannot pile up detached tasks.
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.filter(|u| !u.is_empty()),
        })
    }
}

#[async_trait]
impl OrderNotifier for WebhookNotifier {
    async fn notify(&self, event: OrderEvent, payload: serde_json::Value) {
        let Some(url) = &self.url else {
            return;
        };

        let body = json!({
            "event": event.as_str(),
            "payload": payload,
            "ts": Utc::now().timestamp_millis(),
        });

        match self.client.post(url).json(&body).send().await {
            Ok(res) if res.status().is_success() => {
                debug!(event = %event, "Webhook delivered");
            }
            Ok(res) => {
                warn!(event = %event, status = %res.status(), "Webhook rejected");
            }
            Err(e) => {
                warn!(event = %event, error = %e, "Webhook delivery failed");
            }
        }
    }
}
