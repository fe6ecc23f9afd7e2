//! User profiles and their resolution
//!
//! - [`memory`]: in-process source for tests and demos
//! - [`sqlite`]: SQLite-backed source

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProfileSource;
pub use sqlite::SqliteProfileSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::Result;
use crate::role::Role;
use crate::session::{SessionState, UserId};

/// A user's business profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    /// Role as persisted; parsed on use so unknown values surface as errors
    pub role: String,
    pub onboarding_completed: bool,
}

impl Profile {
    pub fn new(user_id: UserId, role: Role, onboarding_completed: bool) -> Self {
        Self {
            user_id,
            role: role.as_str().to_string(),
            onboarding_completed,
        }
    }

    pub fn role(&self) -> Result<Role> {
        self.role.parse()
    }
}

/// Outcome of fetching the current user's profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    Loading,
    Found(Profile),
    Absent,
    /// The lookup failed
    Error,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(&self, user_id: UserId) -> anyhow::Result<Option<Profile>>;
}

/// Fetch the profile for `session`.
///
/// Only an unresolved session leaves the profile `Loading`; a signed-out
/// user has no profile.
pub async fn resolve_profile(source: &dyn ProfileSource, session: &SessionState) -> ProfileState {
    let user_id = match session {
        SessionState::Unknown => return ProfileState::Loading,
        SessionState::Unauthenticated => return ProfileState::Absent,
        SessionState::Authenticated(user_id) => *user_id,
    };

    match source.fetch(user_id).await {
        Ok(Some(profile)) => ProfileState::Found(profile),
        Ok(None) => ProfileState::Absent,
        Err(e) => {
            error!("Failed to fetch profile for user {}: {}", user_id, e);
            ProfileState::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_resolve_found() {
        let user = Uuid::new_v4();
        let profile = Profile::new(user, Role::Trader, true);
        let expected = profile.clone();

        let mut source = MockProfileSource::new();
        source
            .expect_fetch()
            .with(eq(user))
            .times(1)
            .returning(move |_| Ok(Some(profile.clone())));

        let state = resolve_profile(&source, &SessionState::Authenticated(user)).await;
        assert_eq!(state, ProfileState::Found(expected));
    }

    #[tokio::test]
    async fn test_resolve_absent_and_error() {
        let mut source = MockProfileSource::new();
        source.expect_fetch().times(1).returning(|_| Ok(None));
        let state = resolve_profile(&source, &SessionState::Authenticated(Uuid::new_v4())).await;
        assert_eq!(state, ProfileState::Absent);

        let mut source = MockProfileSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        let state = resolve_profile(&source, &SessionState::Authenticated(Uuid::new_v4())).await;
        assert_eq!(state, ProfileState::Error);
    }

    #[tokio::test]
    async fn test_no_fetch_without_user() {
        let mut source = MockProfileSource::new();
        source.expect_fetch().never();

        assert_eq!(
            resolve_profile(&source, &SessionState::Unknown).await,
            ProfileState::Loading
        );
        assert_eq!(
            resolve_profile(&source, &SessionState::Unauthenticated).await,
            ProfileState::Absent
        );
    }

    #[test]
    fn test_unknown_role_surfaces() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            role: "exporter".to_string(),
            onboarding_completed: true,
        };
        assert!(profile.role().is_err());
    }
}
