//! Workflow error types.

use identity_client::IdentityError;
use notify_client::NotifyError;
use referral_store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a sign-up was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    MissingReferralCode,
    PhoneAlreadyRegistered,
    InvalidOrNonMobilePhone,
    InvalidReferralCode,
}

/// One failed check with its user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub reason: RejectReason,
    pub message: String,
}

impl ValidationFailure {
    pub fn missing_referral_code() -> Self {
        Self {
            reason: RejectReason::MissingReferralCode,
            message: "Referral code missing from sign up.".into(),
        }
    }

    pub fn phone_already_registered(phone_number: &str) -> Self {
        Self {
            reason: RejectReason::PhoneAlreadyRegistered,
            message: format!(
                "An account already exists for phone number \"{}\".",
                phone_number
            ),
        }
    }

    pub fn invalid_or_non_mobile_phone(phone_number: &str) -> Self {
        Self {
            reason: RejectReason::InvalidOrNonMobilePhone,
            message: format!(
                "Phone number \"{}\" is invalid, or not a mobile number.",
                phone_number
            ),
        }
    }

    pub fn invalid_referral_code(referral_code: &str) -> Self {
        Self {
            reason: RejectReason::InvalidReferralCode,
            message: format!("Referral code \"{}\" is invalid.", referral_code),
        }
    }
}

/// Every check that failed for a sign-up attempt. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    failures: Vec<ValidationFailure>,
}

impl ValidationError {
    /// Returns `None` when there is nothing to report.
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Option<Self> {
        (!failures.is_empty()).then_some(Self { failures })
    }

    pub fn single(failure: ValidationFailure) -> Self {
        Self {
            failures: vec![failure],
        }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn reasons(&self) -> Vec<RejectReason> {
        self.failures.iter().map(|f| f.reason).collect()
    }

    pub fn has_reason(&self, reason: RejectReason) -> bool {
        self.failures.iter().any(|f| f.reason == reason)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.failures.iter().map(|f| f.message.as_str()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for ValidationError {}

/// Sign-up validation outcome other than approval.
///
/// Upstream failures keep their cause for logging but display a generic
/// message, since the identity provider may show it to the user.
#[derive(Error, Debug)]
pub enum SignupError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("Internal error. Please try again.")]
    Store(#[source] StoreError),

    #[error("Internal error. Please try again.")]
    Identity(#[source] IdentityError),
}

impl From<StoreError> for SignupError {
    fn from(e: StoreError) -> Self {
        SignupError::Store(e)
    }
}

impl From<IdentityError> for SignupError {
    fn from(e: IdentityError) -> Self {
        SignupError::Identity(e)
    }
}

impl SignupError {
    /// Rejection details, if the sign-up was refused rather than interrupted.
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            SignupError::Rejected(v) => Some(v),
            _ => None,
        }
    }
}

/// Post-confirmation side-effect failure.
#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("Missing user attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Welcome message failed: {0}")]
    Welcome(#[from] NotifyError),

    #[error("Referral lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("Referrer linkage failed: {0}")]
    Link(#[from] IdentityError),
}

/// Invitation dispatch failure.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invitation delivery to {phone_number} failed: {source}")]
    Delivery {
        phone_number: String,
        #[source]
        source: NotifyError,
    },

    #[error("Malformed change record: {0}")]
    MalformedRecord(String),
}
