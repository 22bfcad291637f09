//! JSON file-backed referral store.

use crate::error::StoreError;
use crate::store::ReferralStore;
use crate::table::ReferralTable;
use crate::types::ReferralRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Snapshot schema version.
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk representation of the referral table.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    table_name: String,
    saved_at: DateTime<Utc>,
    records: Vec<ReferralRecord>,
}

/// Referral store persisted to a JSON snapshot after every mutation.
///
/// Mutations are applied and saved under the same write lock. If the save
/// fails the mutation is rolled back, so memory never runs ahead of disk.
pub struct FileReferralStore {
    table: RwLock<ReferralTable>,
    table_name: String,
    storage_path: PathBuf,
}

impl FileReferralStore {
    /// Open the store, loading an existing snapshot if one exists.
    pub async fn open(
        table_name: impl Into<String>,
        storage_path: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let table_name = table_name.into();
        let storage_path = storage_path.into();
        let table = load_snapshot(&storage_path).await?;

        info!(
            table_name = %table_name,
            "Opened referral table with {} records from {:?}",
            table.len(),
            storage_path
        );

        Ok(Self {
            table: RwLock::new(table),
            table_name,
            storage_path,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Write the table atomically using temp file + rename.
    async fn save(&self, table: &ReferralTable) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            table_name: self.table_name.clone(),
            saved_at: Utc::now(),
            records: table.records().cloned().collect(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.storage_path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.storage_path).await?;

        debug!(
            "Saved referral table ({} records, {} bytes) to {:?}",
            snapshot.records.len(),
            data.len(),
            self.storage_path
        );
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<ReferralTable, StoreError> {
    if !fs::try_exists(path).await? {
        info!("Referral table not found at {:?}, starting empty", path);
        return Ok(ReferralTable::new());
    }

    let data = fs::read(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&data)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    Ok(ReferralTable::from_records(snapshot.records))
}

#[async_trait]
impl ReferralStore for FileReferralStore {
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
        self.redeem(phone_number, referral_code).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn redeem(
        &self,
        phone_number: &str,
        referral_code: &str,
    ) -> Result<Option<ReferralRecord>, StoreError> {
        let mut table = self.table.write().await;
        let Some(removed) = table.remove(phone_number, referral_code) else {
            return Ok(None);
        };

        if let Err(e) = self.save(&table).await {
            warn!("Failed to persist removal, restoring record: {}", e);
            table.restore(removed);
            return Err(e);
        }

        Ok(Some(removed))
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

        if let Err(e) = self.save(&table).await {
            warn!("Failed to persist new record, rolling back: {}", e);
            table.remove(&key.phone_number, &key.referral_code);
            return Err(e);
        }

        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.read().await.len())
    }
}
