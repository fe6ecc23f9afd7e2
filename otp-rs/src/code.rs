//! One-time code generation and comparison

use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use subtle::ConstantTimeEq;

/// Number of digits in a code
pub const CODE_LEN: usize = 6;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// A six digit one-time code
///
/// `Debug` is redacted so the secret never reaches a log line by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Draw a fresh code from the OS random source, uniform over 100000..=999999
    pub fn generate() -> Self {
        let value = OsRng.gen_range(CODE_MIN..=CODE_MAX);
        Self(value.to_string())
    }

    /// Rebuild a code read back from storage
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare a submitted code in constant time with respect to the secret.
    ///
    /// Input is trimmed; anything other than six ASCII digits never matches.
    pub fn matches(&self, submitted: &str) -> bool {
        let submitted = submitted.trim().as_bytes();
        let well_formed =
            submitted.len() == CODE_LEN && submitted.iter().all(|b| b.is_ascii_digit());

        // Always run the comparison so malformed input costs the same
        let mut candidate = [b'0'; CODE_LEN];
        if well_formed {
            candidate.copy_from_slice(submitted);
        }
        let equal: bool = self.0.as_bytes().ct_eq(&candidate).into();

        well_formed && equal
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}
