//! Shared HTTP response handling.

use crate::error::IdentityError;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Decode a successful JSON body or convert the failure.
pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    if response.status().is_success() {
        let body = response.text().await?;
        debug!("Response body: {}", body.chars().take(200).collect::<String>());
        serde_json::from_str(&body).map_err(IdentityError::from)
    } else {
        Err(extract_error(response).await)
    }
}

/// Accept any 2xx response, discarding the body.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), IdentityError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(extract_error(response).await)
    }
}

async fn extract_error(response: reqwest::Response) -> IdentityError {
    let status = response.status();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!(%status, "Authentication failed");
            IdentityError::Unauthorized
        }
        _ => {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            IdentityError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}
