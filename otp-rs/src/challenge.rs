//! Challenge model

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::code::OtpCode;
use crate::phone::PhoneNumber;

/// Lifecycle state of a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Issued and still open for verification
    Pending,
    /// Successfully verified (single use)
    Verified,
    /// Validity window elapsed
    Expired,
    /// Superseded by a newer challenge or locked after too many attempts
    Invalidated,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Verified => "verified",
            ChallengeStatus::Expired => "expired",
            ChallengeStatus::Invalidated => "invalidated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChallengeStatus::Pending)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChallengeStatus::Pending),
            "verified" => Ok(ChallengeStatus::Verified),
            "expired" => Ok(ChallengeStatus::Expired),
            "invalidated" => Ok(ChallengeStatus::Invalidated),
            other => Err(format!("unknown challenge status '{}'", other)),
        }
    }
}

/// A single issued OTP bound to a phone and a validity window
#[derive(Debug, Clone)]
pub struct Challenge {
    pub id: Uuid,
    pub phone: PhoneNumber,
    pub code: OtpCode,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempt_count: u32,
    pub status: ChallengeStatus,
}

impl Challenge {
    /// Create a new pending challenge with a freshly generated code
    pub fn issue(phone: PhoneNumber, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone,
            code: OtpCode::generate(),
            created_at: now,
            expires_at: now + ttl,
            attempt_count: 0,
            status: ChallengeStatus::Pending,
        }
    }

    /// Expired strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Public view without the code
    pub fn summary(&self) -> ChallengeSummary {
        ChallengeSummary {
            id: self.id,
            status: self.status,
            attempt_count: self.attempt_count,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Opaque handle returned from issuance
///
/// Carries the code only in debug builds compiled with `insecure-code-echo`.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeHandle {
    pub id: Uuid,
    pub phone: PhoneNumber,
    pub expires_at: DateTime<Utc>,
    #[cfg(feature = "insecure-code-echo")]
    pub code: String,
}

impl ChallengeHandle {
    pub(crate) fn for_challenge(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id,
            phone: challenge.phone.clone(),
            expires_at: challenge.expires_at,
            #[cfg(feature = "insecure-code-echo")]
            code: challenge.code.as_str().to_string(),
        }
    }

    /// The code, when the build echoes it back
    pub fn echoed_code(&self) -> Option<&str> {
        #[cfg(feature = "insecure-code-echo")]
        {
            Some(&self.code)
        }
        #[cfg(not(feature = "insecure-code-echo"))]
        {
            None
        }
    }
}

/// Successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verified {
    pub challenge_id: Uuid,
    pub phone: PhoneNumber,
    pub verified_at: DateTime<Utc>,
}

/// Challenge state without the secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeSummary {
    pub id: Uuid,
    pub status: ChallengeStatus,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
