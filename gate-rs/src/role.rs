//! Business roles and their landing paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GateError;

/// Path for unauthenticated users and users without a profile
pub const AUTH_PATH: &str = "/auth";
/// Neutral fallback when no role-specific path applies
pub const DEFAULT_PATH: &str = "/";

/// A user's business role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trader,
    Manufacturer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Trader, Role::Manufacturer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trader => "trader",
            Role::Manufacturer => "manufacturer",
        }
    }

    /// Where a user of this role completes onboarding
    pub fn onboarding_path(&self) -> &'static str {
        match self {
            Role::Trader => "/onboarding/trader",
            Role::Manufacturer => "/onboarding/manufacturer",
        }
    }

    /// The role's home once onboarded
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Trader => "/trader/dashboard",
            Role::Manufacturer => "/manufacturer/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trader" => Ok(Role::Trader),
            "manufacturer" => Ok(Role::Manufacturer),
            other => Err(GateError::UnrecognizedRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!(matches!(
            "admin".parse::<Role>(),
            Err(GateError::UnrecognizedRole(r)) if r == "admin"
        ));
        // Persisted values are exact
        assert!("Trader".parse::<Role>().is_err());
    }

    #[test]
    fn test_paths_are_distinct() {
        assert_ne!(Role::Trader.dashboard_path(), Role::Manufacturer.dashboard_path());
        assert_ne!(Role::Trader.onboarding_path(), Role::Manufacturer.onboarding_path());
        for role in Role::ALL {
            assert_ne!(role.dashboard_path(), AUTH_PATH);
            assert_ne!(role.onboarding_path(), DEFAULT_PATH);
        }
    }
}
