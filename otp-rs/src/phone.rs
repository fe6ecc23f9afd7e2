//! Phone number normalization
//!
//! Every challenge is keyed by the normalized form, so `+91 98765-43210`,
//! `0091 9876543210` and `9876543210` (with default country code 91) all land
//! on the same key.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{OtpError, Result};

/// Digits in a bare national number that gets the default country code
const NATIONAL_NUMBER_LEN: usize = 10;
const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalized phone identifier (`+` followed by 8-15 digits)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize and validate a raw phone string.
    ///
    /// `default_country_code` is applied to bare 10-digit national numbers.
    pub fn parse(raw: &str, default_country_code: Option<&str>) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OtpError::InvalidPhone("phone number is required".to_string()));
        }

        let mut cleaned = String::with_capacity(trimmed.len());
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => cleaned.push(c),
                '+' if i == 0 => cleaned.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => {
                    return Err(OtpError::InvalidPhone(format!(
                        "unexpected character '{}'",
                        c
                    )))
                }
            }
        }

        let digits = if let Some(rest) = cleaned.strip_prefix('+') {
            rest.to_string()
        } else if let Some(rest) = cleaned.strip_prefix("00") {
            rest.to_string()
        } else if cleaned.len() == NATIONAL_NUMBER_LEN {
            if cleaned.starts_with('0') {
                return Err(OtpError::InvalidPhone(
                    "national number cannot start with 0".to_string(),
                ));
            }
            match default_country_code {
                Some(cc) => format!("{}{}", cc.trim_start_matches('+'), cleaned),
                None => {
                    return Err(OtpError::InvalidPhone(
                        "country code is required".to_string(),
                    ))
                }
            }
        } else {
            return Err(OtpError::InvalidPhone(
                "expected international format".to_string(),
            ));
        };

        if digits.len() < MIN_DIGITS || digits.len() > MAX_DIGITS {
            return Err(OtpError::InvalidPhone(format!(
                "expected {}-{} digits, got {}",
                MIN_DIGITS,
                MAX_DIGITS,
                digits.len()
            )));
        }
        if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::InvalidPhone("invalid country code".to_string()));
        }

        Ok(Self(format!("+{}", digits)))
    }

    /// Wrap an already-normalized value read back from storage.
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint used in logs instead of the raw number
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        hex[..12].to_string()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhoneNumber({})", self.fingerprint())
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
