//! Error types for otp-rs

use std::time::Duration;
use thiserror::Error;

/// Result type alias for OTP operations
pub type Result<T> = std::result::Result<T, OtpError>;

/// OTP error types
#[derive(Error, Debug)]
pub enum OtpError {
    /// Phone identifier failed validation
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// Too many challenges issued for this phone within the window
    #[error("Too many OTP requests, retry in {} seconds", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// No challenge that can be verified exists for this phone
    #[error("No active challenge for this phone")]
    NoActiveChallenge,

    /// The challenge outlived its validity window
    #[error("Challenge expired")]
    ChallengeExpired,

    /// Wrong code, the challenge stays open
    #[error("Code mismatch ({attempts_remaining} attempts remaining)")]
    CodeMismatch { attempts_remaining: u32 },

    /// Attempt cap reached, the challenge is closed
    #[error("Too many failed attempts")]
    TooManyAttempts,

    /// The challenge was already verified once
    #[error("Challenge already used")]
    AlreadyUsed,

    /// Backend failure, retry with backoff
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OtpError {
    /// Transient failures the caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OtpError::Storage(_))
    }

    /// Failures that can only be recovered from by issuing a fresh challenge.
    pub fn requires_new_challenge(&self) -> bool {
        matches!(
            self,
            OtpError::NoActiveChallenge
                | OtpError::ChallengeExpired
                | OtpError::TooManyAttempts
                | OtpError::AlreadyUsed
        )
    }
}

impl From<sqlx::Error> for OtpError {
    fn from(err: sqlx::Error) -> Self {
        OtpError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_retryable() {
        assert!(OtpError::Storage("locked".to_string()).is_retryable());
        assert!(!OtpError::CodeMismatch { attempts_remaining: 2 }.is_retryable());
        assert!(!OtpError::RateLimited { retry_after: Duration::from_secs(5) }.is_retryable());
    }

    #[test]
    fn test_terminal_errors_require_new_challenge() {
        assert!(OtpError::ChallengeExpired.requires_new_challenge());
        assert!(OtpError::TooManyAttempts.requires_new_challenge());
        assert!(OtpError::AlreadyUsed.requires_new_challenge());
        assert!(!OtpError::CodeMismatch { attempts_remaining: 1 }.requires_new_challenge());
        assert!(!OtpError::Storage("down".to_string()).requires_new_challenge());
    }

    #[test]
    fn test_rate_limited_message() {
        let err = OtpError::RateLimited { retry_after: Duration::from_secs(42) };
        assert_eq!(err.to_string(), "Too many OTP requests, retry in 42 seconds");
    }
}
