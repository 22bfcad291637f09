//! Message templates with a single substitution token.

use crate::error::NotifyError;
use serde::Deserialize;

/// Placeholder replaced by the referral code or the recipient's name.
pub const PLACEHOLDER: &str = "{####}";

/// A message body containing exactly one `{####}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct MessageTemplate(String);

impl MessageTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, NotifyError> {
        let template = template.into();
        match template.matches(PLACEHOLDER).count() {
            1 => Ok(Self(template)),
            0 => Err(NotifyError::InvalidTemplate(format!(
                "template must contain the {} placeholder",
                PLACEHOLDER
            ))),
            n => Err(NotifyError::InvalidTemplate(format!(
                "template contains {} placeholders, expected one",
                n
            ))),
        }
    }

    /// Substitute the placeholder with `value`.
    pub fn render(&self, value: &str) -> String {
        self.0.replacen(PLACEHOLDER, value, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageTemplate {
    type Error = NotifyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
