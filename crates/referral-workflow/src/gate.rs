//! Pre-registration validation and referral redemption.

use crate::error::{SignupError, ValidationError, ValidationFailure};
use crate::events::{attributes, TriggerEvent};
use identity_client::{normalize_phone_number, IdentityDirectory, IdentityError, PhoneValidator};
use referral_store::{is_real_code, ReferralRecord, ReferralStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Observations gathered for one sign-up request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupAttempt {
    pub phone_number: String,
    pub referral_code: String,
    pub account_exists: bool,
    pub phone_is_mobile: bool,
    pub referral_record_found: bool,
}

impl SignupAttempt {
    /// All failed checks, in a stable order.
    pub fn failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        if self.account_exists {
            failures.push(ValidationFailure::phone_already_registered(&self.phone_number));
        }
        if !self.phone_is_mobile {
            failures.push(ValidationFailure::invalid_or_non_mobile_phone(
                &self.phone_number,
            ));
        }
        if !self.referral_record_found {
            failures.push(ValidationFailure::invalid_referral_code(&self.referral_code));
        }
        failures
    }
}

/// Gates self-service sign-up on a valid, unused referral code.
///
/// Codes are redeemed at validation time: once every check passes the record
/// is removed with a single atomic `redeem`, and a caller that loses the race
/// sees `InvalidReferralCode`.
pub struct SignupGate {
    store: Arc<dyn ReferralStore>,
    validator: Arc<dyn PhoneValidator>,
    directory: Arc<dyn IdentityDirectory>,
    referrer_attribute: String,
}

impl SignupGate {
    pub fn new(
        store: Arc<dyn ReferralStore>,
        validator: Arc<dyn PhoneValidator>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            store,
            validator,
            directory,
            referrer_attribute: attributes::REFERRER_ID.to_string(),
        }
    }

    /// Override the user attribute that carries the referrer.
    ///
    /// Must match the finalizer's attribute so it picks up the redeemed
    /// referrer instead of searching the store.
    pub fn with_referrer_attribute(mut self, name: impl Into<String>) -> Self {
        self.referrer_attribute = name.into();
        self
    }

    /// Validate a sign-up and redeem its referral code.
    ///
    /// Returns the consumed record so the caller can link the referrer.
    #[instrument(skip(self, referral_code))]
    pub async fn validate(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<ReferralRecord, SignupError> {
        if referral_code.trim().is_empty() {
            debug!("Rejecting sign-up without referral code");
            return Err(ValidationError::single(ValidationFailure::missing_referral_code()).into());
        }

        let attempt = self.inspect(phone_number, referral_code).await?;

        if let Some(rejection) = ValidationError::from_failures(attempt.failures()) {
            info!(reasons = ?rejection.reasons(), "Sign-up rejected");
            return Err(rejection.into());
        }

        match self
            .store
            .redeem(&attempt.phone_number, &attempt.referral_code)
            .await?
        {
            Some(record) => {
                info!(principal_id = %record.principal_id, "Referral code redeemed");
                Ok(record)
            }
            None => {
                warn!("Referral code consumed by a concurrent sign-up");
                Err(ValidationError::single(ValidationFailure::invalid_referral_code(
                    referral_code,
                ))
                .into())
            }
        }
    }

    /// Run the independent checks concurrently and collect the results.
    async fn inspect(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<SignupAttempt, SignupError> {
        let normalized = normalize_phone_number(phone_number);
        let lookup_number = match &normalized {
            Ok(n) => n.as_str(),
            Err(reason) => {
                debug!(reason = %reason, "Phone number failed local normalization");
                phone_number.trim()
            }
        };

        let classify = async {
            if normalized.is_err() {
                return Ok::<_, IdentityError>(None);
            }
            self.validator.classify(lookup_number).await.map(Some)
        };

        // The marker row under the sentinel code is never redeemable
        let lookup = async {
            if !is_real_code(referral_code) {
                return Ok::<_, StoreError>(None);
            }
            self.store.get(lookup_number, referral_code).await
        };

        let (accounts, classification, record) = tokio::join!(
            self.directory.list_by_phone(lookup_number),
            classify,
            lookup,
        );

        let accounts = accounts?;
        let classification = classification?;
        let record = record?;

        if let Some(cleansed) = classification
            .as_ref()
            .and_then(|c| c.cleansed_phone_number_e164.as_deref())
        {
            if cleansed != lookup_number {
                warn!(cleansed = %cleansed, "Validator canonical form differs from lookup key");
            }
        }

        Ok(SignupAttempt {
            phone_number: lookup_number.to_string(),
            referral_code: referral_code.to_string(),
            account_exists: !accounts.is_empty(),
            phone_is_mobile: classification.map(|c| c.is_mobile()).unwrap_or(false),
            referral_record_found: record.is_some(),
        })
    }

    /// Handle a pre-sign-up trigger, returning the event to hand back.
    ///
    /// Administrator-created accounts pass through untouched. Approved
    /// self-service sign-ups are auto-confirmed with a verified phone and
    /// carry the referrer in their user attributes.
    #[instrument(skip(self, event), fields(trigger_source = %event.trigger_source, user_name = %event.user_name))]
    pub async fn handle(&self, mut event: TriggerEvent) -> Result<TriggerEvent, SignupError> {
        if event.is_admin_create() {
            debug!("Administrator-created account, skipping referral checks");
            return Ok(event);
        }

        let phone_number = event
            .user_attribute(attributes::PHONE_NUMBER)
            .unwrap_or_default()
            .to_string();
        let referral_code = event.referral_code().unwrap_or_default().to_string();

        let record = self.validate(&phone_number, &referral_code).await?;

        event.response.auto_confirm_user = Some(true);
        event.response.auto_verify_phone = Some(true);
        event
            .request
            .user_attributes
            .insert(self.referrer_attribute.clone(), record.principal_id);

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> SignupAttempt {
        SignupAttempt {
            phone_number: "+15551230000".into(),
            referral_code: "ABC123".into(),
            account_exists: false,
            phone_is_mobile: true,
            referral_record_found: true,
        }
    }

    #[test]
    fn test_clean_attempt_has_no_failures() {
        assert!(attempt().failures().is_empty());
    }

    #[test]
    fn test_all_failures_reported() {
        let attempt = SignupAttempt {
            account_exists: true,
            phone_is_mobile: false,
            referral_record_found: false,
            ..attempt()
        };

        let reasons: Vec<_> = attempt.failures().into_iter().map(|f| f.reason).collect();
        assert_eq!(
            reasons,
            vec![
                crate::RejectReason::PhoneAlreadyRegistered,
                crate::RejectReason::InvalidOrNonMobilePhone,
                crate::RejectReason::InvalidReferralCode,
            ]
        );
    }
}
