//! Invitation dispatch for newly issued referral codes.

use crate::error::DispatchError;
use crate::events::{ChangeBatch, ChangeKind};
use futures::future::join_all;
use notify_client::{MessageTemplate, Notifier};
use referral_store::ReferralRecord;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of processing a change batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub skipped: usize,
}

/// Sends the invitation for each newly created referral record.
///
/// Dispatch never touches the store; redemption is handled by the gate.
/// There is no internal retry: failures go back to the event source.
pub struct ReferralDispatcher {
    notifier: Arc<dyn Notifier>,
    invitation: MessageTemplate,
}

impl ReferralDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, invitation: MessageTemplate) -> Self {
        Self {
            notifier,
            invitation,
        }
    }

    /// Send the invitation carrying the record's code to its phone number.
    #[instrument(skip(self, record), fields(phone_number = %record.phone_number))]
    pub async fn on_referral_created(&self, record: &ReferralRecord) -> Result<(), DispatchError> {
        let message = self.invitation.render(&record.referral_code);

        self.notifier
            .send(&record.phone_number, &message)
            .await
            .map_err(|source| DispatchError::Delivery {
                phone_number: record.phone_number.clone(),
                source,
            })?;

        debug!("Invitation sent");
        Ok(())
    }

    /// Dispatch every INSERT in the batch concurrently.
    ///
    /// Updates and removals are skipped. All sends are awaited; if any of
    /// them failed the first error is returned so the source redelivers.
    #[instrument(skip(self, batch), fields(records = batch.records.len()))]
    pub async fn handle_batch(&self, batch: ChangeBatch) -> Result<DispatchSummary, DispatchError> {
        let mut inserts = Vec::new();
        let mut skipped = 0;

        for change in &batch.records {
            if change.kind() == ChangeKind::Insert {
                inserts.push(change.new_record()?);
            } else {
                skipped += 1;
            }
        }

        let results = join_all(inserts.iter().map(|r| self.on_referral_created(r))).await;
        let dispatched = results.len();

        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!("Invitation batch failed: {}", err);
            return Err(err);
        }

        info!(dispatched, skipped, "Invitation batch processed");
        Ok(DispatchSummary {
            dispatched,
            skipped,
        })
    }
}
