//! Error types for the referral service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use referral_store::StoreError;
use referral_workflow::{DispatchError, FinalizeError, SignupError, ValidationFailure};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Service error types.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Signup(#[from] SignupError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid phone number format: {0}")]
    InvalidPhoneNumber(String),

    #[error("Invalid referral code: {0}")]
    InvalidReferralCode(String),

    #[error("No referral found for {0}")]
    NotFound(String),

    #[error("Change feed unavailable")]
    FeedClosed,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,

    /// Every failed sign-up check, for rejections
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<ValidationFailure>,
}

impl ServiceError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::Signup(SignupError::Rejected(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SIGNUP_REJECTED")
            }
            ServiceError::Signup(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ServiceError::Finalize(FinalizeError::MissingAttribute(_)) => {
                (StatusCode::BAD_REQUEST, "MISSING_ATTRIBUTE")
            }
            ServiceError::Finalize(_) => (StatusCode::BAD_GATEWAY, "FINALIZE_FAILED"),
            ServiceError::Dispatch(DispatchError::MalformedRecord(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_RECORD")
            }
            ServiceError::Dispatch(_) => (StatusCode::BAD_GATEWAY, "DISPATCH_FAILED"),
            ServiceError::Store(StoreError::DuplicateKey { .. }) => {
                (StatusCode::CONFLICT, "DUPLICATE_KEY")
            }
            ServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ServiceError::InvalidPhoneNumber(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_PHONE_NUMBER")
            }
            ServiceError::InvalidReferralCode(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REFERRAL_CODE")
            }
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServiceError::FeedClosed => (StatusCode::SERVICE_UNAVAILABLE, "FEED_CLOSED"),
            ServiceError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            // Debug output keeps the upstream cause the display text hides
            error!(code, "Request failed: {:?}", self);
        }

        let reasons = match &self {
            ServiceError::Signup(e) => e
                .rejection()
                .map(|r| r.failures().to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            reasons,
        };

        (status, Json(body)).into_response()
    }
}
