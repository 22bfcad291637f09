//! In-process change feed for referrals issued through this service.
//!
//! Plays the role of the table's change stream: each created record is
//! published as an INSERT batch and handed to the dispatcher by a background
//! worker, which owns the redelivery policy.

use crate::config::FeedConfig;
use crate::error::ServiceError;
use referral_workflow::{ChangeBatch, DispatchError, DispatchSummary, ReferralDispatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Redelivery schedule for failed batches.
#[derive(Debug, Clone, Copy)]
pub struct RedeliveryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl From<&FeedConfig> for RedeliveryPolicy {
    fn from(config: &FeedConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

/// Publishing side of the change feed.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: mpsc::Sender<ChangeBatch>,
}

impl ChangeFeed {
    /// Start the delivery worker.
    pub fn spawn(dispatcher: Arc<ReferralDispatcher>, config: &FeedConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let policy = RedeliveryPolicy::from(config);

        let handle = tokio::spawn(run(dispatcher, receiver, policy));
        (Self { sender }, handle)
    }

    /// Queue a batch for delivery.
    pub async fn publish(&self, batch: ChangeBatch) -> Result<(), ServiceError> {
        self.sender
            .send(batch)
            .await
            .map_err(|_| ServiceError::FeedClosed)
    }
}

async fn run(
    dispatcher: Arc<ReferralDispatcher>,
    mut receiver: mpsc::Receiver<ChangeBatch>,
    policy: RedeliveryPolicy,
) {
    while let Some(batch) = receiver.recv().await {
        if let Err(e) = deliver(&dispatcher, &batch, policy).await {
            error!(
                records = batch.records.len(),
                "Dropping change batch after {} attempts: {}",
                policy.max_attempts,
                e
            );
        }
    }
    debug!("Change feed closed");
}

/// Deliver a batch, redelivering with exponential backoff on failure.
///
/// Malformed records are not retried since redelivery cannot fix them.
pub async fn deliver(
    dispatcher: &ReferralDispatcher,
    batch: &ChangeBatch,
    policy: RedeliveryPolicy,
) -> Result<DispatchSummary, DispatchError> {
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match dispatcher.handle_batch(batch.clone()).await {
            Ok(summary) => return Ok(summary),
            Err(e @ DispatchError::MalformedRecord(_)) => return Err(e),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                warn!("Change batch delivery failed (attempt {}): {}", attempt, e);
                sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
        }
    }
}
