//! Route decisions
//!
//! Rules, first match wins:
//!
//! 1. signed out: redirect to `/auth`, whatever the profile shows
//! 2. session or profile still resolving: `Pending`
//! 3. no usable profile: redirect to `/auth`
//! 4. onboarding required but not done: redirect to the role's onboarding page
//! 5. wrong role: redirect to the user's own dashboard
//! 6. otherwise `Allow`
//!
//! A stored role outside the known set is an error after rule 3, so it can
//! never fall through to `Allow`.

use serde::Serialize;
use tracing::{error, warn};

use crate::error::Result;
use crate::profile::ProfileState;
use crate::requirement::RouteRequirement;
use crate::role::{Role, AUTH_PATH, DEFAULT_PATH};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "location", rename_all = "lowercase")]
pub enum Decision {
    Pending,
    Redirect(&'static str),
    Allow,
}

impl Decision {
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Decision::Redirect(path) => Some(*path),
            _ => None,
        }
    }
}

/// Decide whether the current user may view a route
pub fn decide(
    session: &SessionState,
    profile: &ProfileState,
    requirement: &RouteRequirement,
) -> Result<Decision> {
    if matches!(session, SessionState::Unauthenticated) {
        return Ok(Decision::Redirect(AUTH_PATH));
    }

    if matches!(session, SessionState::Unknown) || matches!(profile, ProfileState::Loading) {
        return Ok(Decision::Pending);
    }

    let profile = match profile {
        ProfileState::Found(profile) => profile,
        _ => return Ok(Decision::Redirect(AUTH_PATH)),
    };

    let role = profile.role().map_err(|e| {
        error!("Profile for user {} has {}", profile.user_id, e);
        e
    })?;

    if requirement.require_onboarding && !profile.onboarding_completed {
        return Ok(Decision::Redirect(role.onboarding_path()));
    }

    if let Some(required) = requirement.required_role {
        if required != role {
            return Ok(Decision::Redirect(role.dashboard_path()));
        }
    }

    Ok(Decision::Allow)
}

/// Where to send a user after sign-in
pub fn resolve_landing_path(session: &SessionState, profile: &ProfileState) -> Decision {
    if matches!(session, SessionState::Unauthenticated) {
        return Decision::Redirect(AUTH_PATH);
    }

    if matches!(session, SessionState::Unknown) || matches!(profile, ProfileState::Loading) {
        return Decision::Pending;
    }

    let profile = match profile {
        ProfileState::Found(profile) => profile,
        _ => return Decision::Redirect(AUTH_PATH),
    };

    let role: Role = match profile.role() {
        Ok(role) => role,
        Err(e) => {
            warn!("Landing user {} on default path: {}", profile.user_id, e);
            return Decision::Redirect(DEFAULT_PATH);
        }
    };

    if profile.onboarding_completed {
        Decision::Redirect(role.dashboard_path())
    } else {
        Decision::Redirect(role.onboarding_path())
    }
}
