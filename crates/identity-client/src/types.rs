//! Identity directory and phone validation types.

use serde::{Deserialize, Serialize};

/// Line type reported by the phone validation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhoneType {
    Mobile,
    Landline,
    Voip,
    Invalid,
    Prepaid,
    #[serde(other)]
    Other,
}

/// Result of classifying a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneClassification {
    /// Canonical E.164 form, absent when the number could not be parsed
    #[serde(default)]
    pub cleansed_phone_number_e164: Option<String>,

    pub phone_type: PhoneType,
}

impl PhoneClassification {
    /// Whether the number is valid and can receive text messages.
    pub fn is_mobile(&self) -> bool {
        self.phone_type == PhoneType::Mobile
    }
}

/// Account summary returned by a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateRequest<'a> {
    pub phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListUsersResponse {
    #[serde(default)]
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserAttribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateAttributesRequest<'a> {
    pub attributes: Vec<UserAttribute<'a>>,
}
