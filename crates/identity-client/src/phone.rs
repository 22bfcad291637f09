//! Phone number classification.

use crate::error::IdentityError;
use crate::http::handle_response;
use crate::types::{PhoneClassification, ValidateRequest};
use crate::PhoneValidator;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client for the phone number validation service.
#[derive(Clone)]
pub struct HttpPhoneValidator {
    client: Client,
    base_url: String,
}

impl HttpPhoneValidator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PhoneValidator for HttpPhoneValidator {
    #[instrument(skip(self))]
    async fn classify(&self, phone_number: &str) -> Result<PhoneClassification, IdentityError> {
        let response = self
            .client
            .post(format!("{}/v1/phone/validate", self.base_url))
            .json(&ValidateRequest { phone_number })
            .send()
            .await?;

        let classification: PhoneClassification = handle_response(response).await?;
        debug!(phone_type = ?classification.phone_type, "Phone number classified");
        Ok(classification)
    }
}

/// Normalize a phone number to E.164 format.
pub fn normalize_phone_number(number: &str) -> Result<String, String> {
    let trimmed = number.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err("Phone number must contain at least one digit".into());
    }

    if digits.len() < 7 {
        return Err("Phone number too short".into());
    }

    if digits.len() > 15 {
        return Err("Phone number too long".into());
    }

    if has_plus || digits.len() >= 10 {
        Ok(format!("+{}", digits))
    } else {
        Err("Phone number must include country code".into())
    }
}
