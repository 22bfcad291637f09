//! Referral record types.

use serde::{Deserialize, Serialize};

/// Lower bound for real referral codes.
///
/// Each phone number may carry a reserved marker row under this code; range
/// lookups only return codes that compare strictly greater than it.
pub const REFERRAL_CODE_SENTINEL: &str = "0";

/// A single-use referral code issued to a referrer for a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// Referred phone number in E.164 format (e.g., "+447911123456")
    pub phone_number: String,

    /// Opaque referral code
    pub referral_code: String,

    /// Identity of the referrer who issued the code
    pub principal_id: String,
}

impl ReferralRecord {
    pub fn new(
        phone_number: impl Into<String>,
        referral_code: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            phone_number: phone_number.into(),
            referral_code: referral_code.into(),
            principal_id: principal_id.into(),
        }
    }

    /// Primary key of the record.
    pub fn key(&self) -> ReferralKey {
        ReferralKey::new(&self.phone_number, &self.referral_code)
    }

    /// Whether this row holds a real code rather than the reserved marker.
    pub fn is_redeemable_code(&self) -> bool {
        is_real_code(&self.referral_code)
    }
}

/// Composite primary key: (phone_number, referral_code).
///
/// Ordering is phone first, then code, so all codes for one phone number are
/// contiguous and sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferralKey {
    pub phone_number: String,
    pub referral_code: String,
}

impl ReferralKey {
    pub fn new(phone_number: &str, referral_code: &str) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            referral_code: referral_code.to_string(),
        }
    }

    /// The marker key for a phone number; real codes sort strictly after it.
    pub fn sentinel(phone_number: &str) -> Self {
        Self::new(phone_number, REFERRAL_CODE_SENTINEL)
    }
}

/// Check whether a code compares greater than the sentinel.
pub fn is_real_code(referral_code: &str) -> bool {
    referral_code > REFERRAL_CODE_SENTINEL
}
