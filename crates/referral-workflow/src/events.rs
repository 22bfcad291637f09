//! Trigger payloads delivered by the identity provider and the referral
//! table change stream.

use crate::error::DispatchError;
use referral_store::ReferralRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pre-sign-up trigger raised when an administrator creates the account.
pub const PRE_SIGN_UP_ADMIN_CREATE_USER: &str = "PreSignUp_AdminCreateUser";

/// Post-confirmation trigger raised by a self-service sign-up confirmation.
pub const POST_CONFIRMATION_CONFIRM_SIGN_UP: &str = "PostConfirmation_ConfirmSignUp";

/// Change event name for newly inserted records.
pub const INSERT_EVENT: &str = "INSERT";

/// User attribute keys read and written by the workflow.
pub mod attributes {
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const NAME: &str = "name";
    pub const REFERRAL_CODE: &str = "referral_code";
    pub const REFERRER_ID: &str = "referrer_id";
}

/// Identity provider trigger event.
///
/// Fields the workflow does not interpret are kept in `extra` so the event
/// can be handed back to the provider unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub trigger_source: String,

    #[serde(default)]
    pub user_pool_id: String,

    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub request: TriggerRequest,

    #[serde(default)]
    pub response: TriggerResponse,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_confirm_user: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_phone: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_email: Option<bool>,
}

impl TriggerEvent {
    pub fn new(trigger_source: impl Into<String>) -> Self {
        Self {
            trigger_source: trigger_source.into(),
            user_pool_id: String::new(),
            user_name: String::new(),
            request: TriggerRequest::default(),
            response: TriggerResponse::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_admin_create(&self) -> bool {
        self.trigger_source == PRE_SIGN_UP_ADMIN_CREATE_USER
    }

    pub fn is_confirm_sign_up(&self) -> bool {
        self.trigger_source == POST_CONFIRMATION_CONFIRM_SIGN_UP
    }

    pub fn user_attribute(&self, name: &str) -> Option<&str> {
        self.request.user_attributes.get(name).map(String::as_str)
    }

    /// Referral code supplied with the sign-up, if any.
    pub fn referral_code(&self) -> Option<&str> {
        self.request
            .validation_data
            .as_ref()
            .and_then(|data| data.get(attributes::REFERRAL_CODE))
            .map(String::as_str)
    }
}

/// Kind of change carried by a stream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
    Unknown,
}

impl ChangeKind {
    pub fn from_event_name(name: &str) -> Self {
        match name {
            INSERT_EVENT => ChangeKind::Insert,
            "MODIFY" => ChangeKind::Modify,
            "REMOVE" => ChangeKind::Remove,
            _ => ChangeKind::Unknown,
        }
    }
}

/// A batch of change records from the referral table stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,

    #[serde(default)]
    pub dynamodb: StreamRecord,
}

/// Typed attribute images of a changed item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<BTreeMap<String, AttributeValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<BTreeMap<String, AttributeValue>>,
}

/// A typed attribute value; only string values are used here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            s: Some(value.into()),
        }
    }
}

impl ChangeRecord {
    /// Build an insert record carrying the full new image.
    pub fn insert(record: &ReferralRecord) -> Self {
        let image = BTreeMap::from([
            (
                "phone_number".to_string(),
                AttributeValue::string(&record.phone_number),
            ),
            (
                "referral_code".to_string(),
                AttributeValue::string(&record.referral_code),
            ),
            (
                "principal_id".to_string(),
                AttributeValue::string(&record.principal_id),
            ),
        ]);

        Self {
            event_name: INSERT_EVENT.to_string(),
            dynamodb: StreamRecord {
                keys: None,
                new_image: Some(image),
            },
        }
    }

    pub fn kind(&self) -> ChangeKind {
        ChangeKind::from_event_name(&self.event_name)
    }

    /// Decode the new image into a referral record.
    pub fn new_record(&self) -> Result<ReferralRecord, DispatchError> {
        let image = self
            .dynamodb
            .new_image
            .as_ref()
            .ok_or_else(|| DispatchError::MalformedRecord("missing NewImage".into()))?;

        let field = |name: &str| {
            image
                .get(name)
                .and_then(|v| v.s.clone())
                .ok_or_else(|| DispatchError::MalformedRecord(format!("missing string {}", name)))
        };

        Ok(ReferralRecord {
            phone_number: field("phone_number")?,
            referral_code: field("referral_code")?,
            principal_id: field("principal_id")?,
        })
    }
}
