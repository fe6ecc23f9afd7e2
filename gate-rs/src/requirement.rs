use serde::Deserialize;

use crate::role::Role;

/// What a route demands of the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RouteRequirement {
    #[serde(default)]
    pub required_role: Option<Role>,
    #[serde(default = "default_require_onboarding")]
    pub require_onboarding: bool,
}

fn default_require_onboarding() -> bool {
    true
}

impl RouteRequirement {
    /// Any role, onboarding required
    pub fn any_role() -> Self {
        Self::default()
    }

    pub fn for_role(role: Role) -> Self {
        Self {
            required_role: Some(role),
            ..Self::default()
        }
    }

    /// Allow users that have not finished onboarding (the onboarding pages themselves)
    pub fn without_onboarding(mut self) -> Self {
        self.require_onboarding = false;
        self
    }
}

impl Default for RouteRequirement {
    fn default() -> Self {
        Self {
            required_role: None,
            require_onboarding: default_require_onboarding(),
        }
    }
}
