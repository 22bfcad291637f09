//! Signal CLI REST API notifier.

use crate::error::NotifyError;
use crate::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Outgoing message request.
#[derive(Debug, Clone, Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
    number: &'a str,
    recipients: [&'a str; 1],
}

/// Sends text messages from a registered sender number.
#[derive(Clone)]
pub struct SignalNotifier {
    client: Client,
    base_url: String,
    sender_number: String,
}

impl SignalNotifier {
    pub fn new(
        base_url: impl Into<String>,
        sender_number: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            sender_number: sender_number.into(),
        })
    }

    pub fn sender_number(&self) -> &str {
        &self.sender_number
    }

    /// Check if the Signal API is healthy.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Notifier for SignalNotifier {
    #[instrument(skip(self, message))]
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            message,
            number: &self.sender_number,
            recipients: [phone_number],
        };

        let response = self
            .client
            .post(format!("{}/v2/send", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(status, "Send failed: {}", message);
            return Err(NotifyError::SendFailed { status, message });
        }

        debug!("Sent message to {}", phone_number);
        Ok(())
    }
}
