//! Shared mocks and fixtures for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use identity_client::{
    IdentityDirectory, IdentityError, PhoneClassification, PhoneType, PhoneValidator, UserSummary,
};
use mockall::mock;
use notify_client::{MessageTemplate, Notifier, NotifyError};
use referral_store::{MemoryReferralStore, ReferralRecord, ReferralStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PHONE: &str = "+15551230000";
pub const CODE: &str = "ABC123";
pub const PRINCIPAL: &str = "P1";

mock! {
    pub Sender {}

    #[async_trait]
    impl Notifier for Sender {
        async fn send(&self, phone_number: &str, message: &str) -> Result<(), NotifyError>;
    }
}

mock! {
    pub Validator {}

    #[async_trait]
    impl PhoneValidator for Validator {
        async fn classify(&self, phone_number: &str) -> Result<PhoneClassification, IdentityError>;
    }
}

mock! {
    pub Directory {}

    #[async_trait]
    impl IdentityDirectory for Directory {
        async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<UserSummary>, IdentityError>;

        async fn set_attribute(
            &self,
            user_pool_id: &str,
            username: &str,
            name: &str,
            value: &str,
        ) -> Result<(), IdentityError>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl ReferralStore for Store {
        async fn get(
            &self,
            phone_number: &str,
            referral_code: &str,
        ) -> Result<Option<ReferralRecord>, StoreError>;

        async fn query_by_phone(
            &self,
            phone_number: &str,
        ) -> Result<Option<ReferralRecord>, StoreError>;

        async fn delete(&self, phone_number: &str, referral_code: &str) -> Result<(), StoreError>;

        async fn redeem(
            &self,
            phone_number: &str,
            referral_code: &str,
        ) -> Result<Option<ReferralRecord>, StoreError>;

        async fn create(&self, record: ReferralRecord) -> Result<(), StoreError>;

        async fn count(&self) -> Result<usize, StoreError>;
    }
}

pub fn referral() -> ReferralRecord {
    ReferralRecord::new(PHONE, CODE, PRINCIPAL)
}

pub fn seeded_store() -> Arc<MemoryReferralStore> {
    Arc::new(MemoryReferralStore::with_records(vec![referral()]))
}

pub fn classification(phone_type: PhoneType) -> PhoneClassification {
    PhoneClassification {
        cleansed_phone_number_e164: Some(PHONE.to_string()),
        phone_type,
    }
}

/// Validator that classifies every number as the given type.
pub fn validator(phone_type: PhoneType) -> MockValidator {
    let mut validator = MockValidator::new();
    validator
        .expect_classify()
        .returning(move |_| Ok(classification(phone_type)));
    validator
}

/// Directory reporting `existing` accounts for every number.
pub fn directory(existing: usize) -> MockDirectory {
    let mut directory = MockDirectory::new();
    directory.expect_list_by_phone().returning(move |_| {
        Ok((0..existing)
            .map(|i| UserSummary {
                username: format!("user-{}", i),
                status: Some("CONFIRMED".into()),
            })
            .collect())
    });
    directory
}

/// Notifier that accepts every message and counts them.
pub fn counting_sender(sent: Arc<Mutex<Vec<(String, String)>>>) -> MockSender {
    let mut sender = MockSender::new();
    sender.expect_send().returning(move |phone, message| {
        sent.lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    });
    sender
}

pub fn send_failure() -> NotifyError {
    NotifyError::SendFailed {
        status: 500,
        message: "gateway down".into(),
    }
}

pub fn welcome_template() -> MessageTemplate {
    MessageTemplate::new("Welcome to Sitters, {####}!").unwrap()
}

pub fn invitation_template() -> MessageTemplate {
    MessageTemplate::new("You have been invited! Your code is {####}.").unwrap()
}

/// Directory fake keeping user attributes in memory.
#[derive(Default)]
pub struct RecordingDirectory {
    pub attributes: Mutex<HashMap<(String, String, String), String>>,
    pub writes: Mutex<usize>,
}

impl RecordingDirectory {
    pub fn attribute(&self, pool: &str, username: &str, name: &str) -> Option<String> {
        self.attributes
            .lock()
            .unwrap()
            .get(&(pool.to_string(), username.to_string(), name.to_string()))
            .cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl IdentityDirectory for RecordingDirectory {
    async fn list_by_phone(&self, _phone_number: &str) -> Result<Vec<UserSummary>, IdentityError> {
        Ok(Vec::new())
    }

    async fn set_attribute(
        &self,
        user_pool_id: &str,
        username: &str,
        name: &str,
        value: &str,
    ) -> Result<(), IdentityError> {
        self.attributes.lock().unwrap().insert(
            (
                user_pool_id.to_string(),
                username.to_string(),
                name.to_string(),
            ),
            value.to_string(),
        );
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
