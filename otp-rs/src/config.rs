//! OTP service settings

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{OtpError, Result};
use crate::rate_limit::RateLimitPolicy;

/// Upper bound for every `*_secs` setting (ten years)
pub const MAX_DURATION_SECS: i64 = 10 * 365 * 24 * 3600;

/// OTP service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Challenge validity window in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: i64,
    /// Failed verifications before a challenge is locked
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Challenges allowed per phone within `issue_window_secs`
    #[serde(default = "default_issue_limit")]
    pub issue_limit: usize,
    #[serde(default = "default_issue_window")]
    pub issue_window_secs: i64,
    /// OTP endpoint requests allowed per client IP within `ip_window_secs`
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    #[serde(default = "default_ip_window")]
    pub ip_window_secs: i64,
    /// Interval of the expiry sweep
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// How long terminal challenges are kept after expiry
    #[serde(default = "default_retention")]
    pub retention_secs: i64,
    /// Country code applied to bare 10-digit national numbers
    #[serde(default = "default_country_code")]
    pub default_country_code: Option<String>,
}

fn default_code_ttl() -> i64 {
    300
}

fn default_max_attempts() -> u32 {
    5
}

fn default_issue_limit() -> usize {
    5
}

fn default_issue_window() -> i64 {
    3600
}

fn default_ip_limit() -> usize {
    30
}

fn default_ip_window() -> i64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_retention() -> i64 {
    24 * 3600
}

fn default_country_code() -> Option<String> {
    Some("91".to_string())
}

impl OtpConfig {
    pub fn code_ttl(&self) -> Duration {
        Duration::seconds(clamp_secs(self.code_ttl_secs))
    }

    pub fn retention(&self) -> Duration {
        Duration::seconds(clamp_secs(self.retention_secs))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn phone_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.issue_limit, clamp_secs(self.issue_window_secs))
    }

    pub fn ip_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.ip_limit, clamp_secs(self.ip_window_secs))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_secs("code_ttl_secs", self.code_ttl_secs, 1)?;
        check_secs("issue_window_secs", self.issue_window_secs, 1)?;
        check_secs("ip_window_secs", self.ip_window_secs, 1)?;
        check_secs("retention_secs", self.retention_secs, 0)?;
        let sweep = i64::try_from(self.sweep_interval_secs).unwrap_or(i64::MAX);
        check_secs("sweep_interval_secs", sweep, 1)?;

        if self.max_attempts == 0 {
            return Err(OtpError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.issue_limit == 0 {
            return Err(OtpError::Config("issue_limit must be at least 1".to_string()));
        }
        if self.ip_limit == 0 {
            return Err(OtpError::Config("ip_limit must be at least 1".to_string()));
        }
        if let Some(cc) = &self.default_country_code {
            let digits = cc.trim_start_matches('+');
            if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(OtpError::Config(format!("invalid default_country_code '{}'", cc)));
            }
        }
        Ok(())
    }
}

/// Accessors clamp to `0..=MAX_DURATION_SECS` even on unvalidated configs
fn clamp_secs(value: i64) -> i64 {
    value.clamp(0, MAX_DURATION_SECS)
}

fn check_secs(name: &str, value: i64, min: i64) -> Result<()> {
    if value < min || value > MAX_DURATION_SECS {
        return Err(OtpError::Config(format!(
            "{} must be between {} and {}, got {}",
            name, min, MAX_DURATION_SECS, value
        )));
    }
    Ok(())
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            max_attempts: default_max_attempts(),
            issue_limit: default_issue_limit(),
            issue_window_secs: default_issue_window(),
            ip_limit: default_ip_limit(),
            ip_window_secs: default_ip_window(),
            sweep_interval_secs: default_sweep_interval(),
            retention_secs: default_retention(),
            default_country_code: default_country_code(),
        }
    }
}
