use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Profile, ProfileSource};
use crate::session::UserId;

/// In-memory profile source
#[derive(Clone, Default)]
pub struct MemoryProfileSource {
    profiles: Arc<RwLock<HashMap<UserId, Profile>>>,
}

impl MemoryProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: Profile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id, profile);
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Profile> {
        let mut profiles = self.profiles.write().await;
        profiles.remove(&user_id)
    }
}

#[async_trait]
impl ProfileSource for MemoryProfileSource {
    async fn fetch(&self, user_id: UserId) -> anyhow::Result<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&user_id).cloned())
    }
}
