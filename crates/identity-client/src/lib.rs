//! Clients for the identity provider.
//!
//! Two capabilities are exposed as traits so workflow code can be tested
//! against fakes:
//! - `IdentityDirectory`: account lookup by phone and attribute updates
//! - `PhoneValidator`: line-type classification of a phone number

mod directory;
mod error;
mod http;
mod phone;
mod types;

pub use directory::HttpIdentityDirectory;
pub use error::IdentityError;
pub use phone::{normalize_phone_number, HttpPhoneValidator};
pub use types::{PhoneClassification, PhoneType, UserSummary};

use async_trait::async_trait;

/// User directory of the identity provider.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Accounts already registered with this phone number.
    async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<UserSummary>, IdentityError>;

    /// Set a single attribute on a user record.
    async fn set_attribute(
        &self,
        user_pool_id: &str,
        username: &str,
        name: &str,
        value: &str,
    ) -> Result<(), IdentityError>;
}

/// Phone number classification service.
#[async_trait]
pub trait PhoneValidator: Send + Sync {
    async fn classify(&self, phone_number: &str) -> Result<PhoneClassification, IdentityError>;
}
