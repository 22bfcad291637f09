//! Notification errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Send failed: {status} - {message}")]
    SendFailed { status: u16, message: String },

    #[error("Invalid message template: {0}")]
    InvalidTemplate(String),
}
