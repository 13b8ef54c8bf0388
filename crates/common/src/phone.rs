//! Kenyan phone number normalization for the payment gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The phone number format was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid phone number format: use 254XXXXXXXXX or 0XXXXXXXXX")]
pub struct PhoneNumberError;

/// A phone number normalized to the international `254XXXXXXXXX` form.
///
/// Accepted inputs are the local format (`0XXXXXXXXX`, 10 digits) or the
/// international format (`254XXXXXXXXX`, 12 digits, optional leading `+`).
/// All outbound gateway calls use the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and normalizes a raw phone number.
    pub fn parse(raw: &str) -> Result<Self, PhoneNumberError> {
        let digits = raw.trim().trim_start_matches('+');

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError);
        }

        if digits.len() == 12 && digits.starts_with("254") {
            return Ok(Self(digits.to_string()));
        }

        if digits.len() == 10 && digits.starts_with('0') {
            return Ok(Self(format!("254{}", &digits[1..])));
        }

        Err(PhoneNumberError)
    }

    /// Returns the normalized number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
