//! Post-confirmation welcome and referrer linkage.

use crate::error::FinalizeError;
use crate::events::{attributes, TriggerEvent};
use identity_client::{normalize_phone_number, IdentityDirectory};
use notify_client::{MessageTemplate, Notifier};
use referral_store::ReferralStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What finalization did for a confirmed user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// Referrer linked to the account, if a referral record was found
    pub referrer_id: Option<String>,
}

/// Welcomes confirmed users and links them to their referrer.
///
/// A referrer already recorded on the event by the gate wins; the store is
/// only searched for accounts that never went through the gate.
///
/// Safe to re-run: a retry re-sends the welcome and rewrites the same
/// attribute value.
pub struct SignupFinalizer {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn ReferralStore>,
    directory: Arc<dyn IdentityDirectory>,
    welcome: MessageTemplate,
    referrer_attribute: String,
}

impl SignupFinalizer {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn ReferralStore>,
        directory: Arc<dyn IdentityDirectory>,
        welcome: MessageTemplate,
    ) -> Self {
        Self {
            notifier,
            store,
            directory,
            welcome,
            referrer_attribute: attributes::REFERRER_ID.to_string(),
        }
    }

    /// Override the directory attribute that stores the referrer.
    pub fn with_referrer_attribute(mut self, name: impl Into<String>) -> Self {
        self.referrer_attribute = name.into();
        self
    }

    /// Send the welcome message and link the referrer found in the store.
    ///
    /// Both side effects run concurrently and are both awaited; either
    /// failing fails the call.
    #[instrument(skip(self, display_name))]
    pub async fn finalize(
        &self,
        phone_number: &str,
        display_name: &str,
        user_pool_id: &str,
        username: &str,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        self.complete(phone_number, display_name, user_pool_id, username, None)
            .await
    }

    /// Like `finalize`, but links a referrer already resolved at sign-up.
    ///
    /// The store is not consulted, so a record left for the same phone by
    /// another referrer cannot replace the one that was redeemed.
    #[instrument(skip(self, display_name))]
    pub async fn finalize_with_referrer(
        &self,
        phone_number: &str,
        display_name: &str,
        user_pool_id: &str,
        username: &str,
        referrer_id: &str,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        self.complete(
            phone_number,
            display_name,
            user_pool_id,
            username,
            Some(referrer_id),
        )
        .await
    }

    async fn complete(
        &self,
        phone_number: &str,
        display_name: &str,
        user_pool_id: &str,
        username: &str,
        known_referrer: Option<&str>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let message = self.welcome.render(display_name);

        let (welcome, link) = tokio::join!(
            self.notifier.send(phone_number, &message),
            self.link_referrer(phone_number, user_pool_id, username, known_referrer),
        );

        welcome?;
        let referrer_id = link?;

        info!(linked = referrer_id.is_some(), "Sign-up finalized");
        Ok(FinalizeOutcome { referrer_id })
    }

    async fn link_referrer(
        &self,
        phone_number: &str,
        user_pool_id: &str,
        username: &str,
        known_referrer: Option<&str>,
    ) -> Result<Option<String>, FinalizeError> {
        let referrer_id = match known_referrer {
            Some(id) => id.to_string(),
            None => match self.store.query_by_phone(phone_number).await? {
                Some(record) => record.principal_id,
                None => {
                    debug!("No referral record for phone number");
                    return Ok(None);
                }
            },
        };

        self.directory
            .set_attribute(
                user_pool_id,
                username,
                &self.referrer_attribute,
                &referrer_id,
            )
            .await?;

        Ok(Some(referrer_id))
    }

    /// Handle a post-confirmation trigger.
    ///
    /// Only self-service confirmations are finalized; any other trigger
    /// source returns the event unchanged.
    #[instrument(skip(self, event), fields(trigger_source = %event.trigger_source, user_name = %event.user_name))]
    pub async fn handle(&self, event: TriggerEvent) -> Result<TriggerEvent, FinalizeError> {
        if !event.is_confirm_sign_up() {
            debug!("Not a sign-up confirmation, nothing to do");
            return Ok(event);
        }

        let raw_phone = event
            .user_attribute(attributes::PHONE_NUMBER)
            .ok_or(FinalizeError::MissingAttribute(attributes::PHONE_NUMBER))?;
        // Same key the gate used when the code was redeemed
        let phone_number =
            normalize_phone_number(raw_phone).unwrap_or_else(|_| raw_phone.trim().to_string());
        let display_name = event
            .user_attribute(attributes::NAME)
            .unwrap_or(&event.user_name);

        match event.user_attribute(&self.referrer_attribute) {
            Some(referrer_id) => {
                debug!("Referrer resolved at sign-up");
                self.finalize_with_referrer(
                    &phone_number,
                    display_name,
                    &event.user_pool_id,
                    &event.user_name,
                    referrer_id,
                )
                .await?;
            }
            None => {
                self.finalize(
                    &phone_number,
                    display_name,
                    &event.user_pool_id,
                    &event.user_name,
                )
                .await?;
            }
        }

        Ok(event)
    }
}
