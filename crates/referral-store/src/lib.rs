//! Referral code storage.
//!
//! Records are keyed by (phone_number, referral_code) and are consumable at
//! most once: after `redeem` or `delete` succeeds the record is gone for good.
//! Two backends are provided:
//! - `MemoryReferralStore` for tests and ephemeral deployments
//! - `FileReferralStore` persisting a JSON snapshot after each mutation

mod error;
mod file;
mod store;
mod table;
mod types;

pub use error::StoreError;
pub use file::FileReferralStore;
pub use store::{MemoryReferralStore, ReferralStore};
pub use table::ReferralTable;
pub use types::*;
