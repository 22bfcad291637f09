//! Ordered in-memory referral table.

use crate::types::{ReferralKey, ReferralRecord};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Referral records ordered by (phone_number, referral_code).
#[derive(Debug, Clone, Default)]
pub struct ReferralTable {
    records: BTreeMap<ReferralKey, ReferralRecord>,
}

impl ReferralTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records; later duplicates overwrite earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = ReferralRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key(), r)).collect(),
        }
    }

    /// Point lookup by exact key.
    pub fn get(&self, phone_number: &str, referral_code: &str) -> Option<&ReferralRecord> {
        self.records
            .get(&ReferralKey::new(phone_number, referral_code))
    }

    /// First record for the phone number whose code sorts after the sentinel.
    pub fn first_after_sentinel(&self, phone_number: &str) -> Option<&ReferralRecord> {
        self.records
            .range((
                Bound::Excluded(ReferralKey::sentinel(phone_number)),
                Bound::Unbounded,
            ))
            .next()
            .filter(|(key, _)| key.phone_number == phone_number)
            .map(|(_, record)| record)
    }

    /// Insert a record if its key is vacant. Returns false when occupied.
    pub fn insert_new(&mut self, record: ReferralRecord) -> bool {
        let key = record.key();
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// Remove a record, returning it if it was present.
    pub fn remove(&mut self, phone_number: &str, referral_code: &str) -> Option<ReferralRecord> {
        self.records
            .remove(&ReferralKey::new(phone_number, referral_code))
    }

    /// Put back a record removed earlier.
    pub fn restore(&mut self, record: ReferralRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn records(&self) -> impl Iterator<Item = &ReferralRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
