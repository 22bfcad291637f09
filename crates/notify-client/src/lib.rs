//! Outbound text notifications.
//!
//! Invitations and welcome messages are rendered from a `MessageTemplate`
//! and delivered through a `Notifier`. Delivery is attempted once; callers
//! decide whether to retry.

mod client;
mod error;
mod template;

pub use client::SignalNotifier;
pub use error::NotifyError;
pub use template::{MessageTemplate, PLACEHOLDER};

use async_trait::async_trait;

/// Sends a rendered message to a phone number.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), NotifyError>;
}
