//! Referral store contract and in-memory implementation.

use crate::error::StoreError;
use crate::table::ReferralTable;
use crate::types::ReferralRecord;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Key-value persistence for referral records.
///
/// The store is the single source of truth for code validity. A record that
/// has been redeemed or deleted must never be returned again.
#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Point lookup by exact (phone_number, referral_code).
    async fn get(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<Option<ReferralRecord>, StoreError>;

    /// Range lookup for a record whose code sorts after the sentinel.
    async fn query_by_phone(&self, phone_number: &str)
        -> Result<Option<ReferralRecord>, StoreError>;

    /// Idempotent removal. Deleting a missing key is not an error.
    async fn delete(&self, phone_number: &str, referral_code: &str) -> Result<(), StoreError>;

    /// Atomically delete the record if it exists and return its pre-image.
    ///
    /// Of several concurrent callers for the same key, at most one receives
    /// `Some`.
    async fn redeem(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<Option<ReferralRecord>, StoreError>;

    /// Insert a new record. Fails with `DuplicateKey` if the key exists.
    async fn create(&self, record: ReferralRecord) -> Result<(), StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// In-memory referral store.
#[derive(Default)]
pub struct MemoryReferralStore {
    table: RwLock<ReferralTable>,
}

impl MemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = ReferralRecord>) -> Self {
        Self {
            table: RwLock::new(ReferralTable::from_records(records)),
        }
    }
}

#[async_trait]
impl ReferralStore for MemoryReferralStore {
    #[instrument(skip(self))]
    async fn get(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<Option<ReferralRecord>, StoreError> {
        let table = self.table.read().await;
        Ok(table.get(phone_number, referral_code).cloned())
    }

    #[instrument(skip(self))]
    async fn query_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<ReferralRecord>, StoreError> {
        let table = self.table.read().await;
        Ok(table.first_after_sentinel(phone_number).cloned())
    }

    #[instrument(skip(self))]
    async fn delete(&self, phone_number: &str, referral_code: &str) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        if table.remove(phone_number, referral_code).is_some() {
            debug!("Deleted referral record");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn redeem(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<Option<ReferralRecord>, StoreError> {
        let mut table = self.table.write().await;
        let redeemed = table.remove(phone_number, referral_code);
        debug!(redeemed = redeemed.is_some(), "Redeem attempted");
        Ok(redeemed)
    }

    #[instrument(skip(self, record), fields(phone_number = %record.phone_number))]
    async fn create(&self, record: ReferralRecord) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let key = record.key();
        if !table.insert_new(record) {
            return Err(StoreError::DuplicateKey {
                phone_number: key.phone_number,
                referral_code: key.referral_code,
            });
        }
        debug!("Created referral record");
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.read().await.len())
    }
}
