//! API request and response types.

use referral_store::ReferralRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub referral_count: usize,
}

/// Request to issue a referral to a phone number.
#[derive(Debug, Deserialize)]
pub struct CreateReferralRequest {
    /// Invitee phone number; normalized to E.164 before storing
    pub phone_number: String,

    pub referral_code: String,

    /// Principal id of the referring user
    pub principal_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    pub phone_number: String,
    pub referral_code: String,
    pub principal_id: String,
}

impl From<ReferralRecord> for ReferralResponse {
    fn from(record: ReferralRecord) -> Self {
        Self {
            phone_number: record.phone_number,
            referral_code: record.referral_code,
            principal_id: record.principal_id,
        }
    }
}
