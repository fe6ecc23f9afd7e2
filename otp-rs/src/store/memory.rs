use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::ChallengeStore;
use crate::challenge::{Challenge, ChallengeStatus};
use crate::error::Result;
use crate::phone::PhoneNumber;

type Bucket = Arc<Mutex<Vec<Challenge>>>;

/// In-memory challenge store
///
/// Challenges are bucketed per phone, each bucket behind its own lock and
/// kept in issue order, so the newest one for a phone wins even when two
/// share a timestamp. The outer maps are only held long enough to find a
/// bucket.
#[derive(Clone, Default)]
pub struct MemoryChallengeStore {
    buckets: Arc<RwLock<HashMap<PhoneNumber, Bucket>>>,
    /// Challenge id to owning phone
    index: Arc<RwLock<HashMap<Uuid, PhoneNumber>>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored challenges
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for bucket in self.snapshot().await {
            let challenges = bucket.lock().await;
            total += challenges.len();
        }
        total
    }

    /// Number of phones with at least one stored challenge
    pub async fn phones(&self) -> usize {
        self.buckets.read().await.len()
    }

    async fn bucket(&self, phone: &PhoneNumber) -> Option<Bucket> {
        self.buckets.read().await.get(phone).cloned()
    }

    async fn bucket_for_id(&self, id: Uuid) -> Option<Bucket> {
        let phone = self.index.read().await.get(&id).cloned()?;
        self.bucket(&phone).await
    }

    async fn snapshot(&self) -> Vec<Bucket> {
        self.buckets.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        // Push under the map lock so a purge can never drop a bucket mid-insert
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(challenge.phone.clone()).or_default().clone();
        bucket.lock().await.push(challenge.clone());
        self.index
            .write()
            .await
            .insert(challenge.id, challenge.phone.clone());
        Ok(())
    }

    async fn current(&self, phone: &PhoneNumber) -> Result<Option<Challenge>> {
        let Some(bucket) = self.bucket(phone).await else {
            return Ok(None);
        };
        let challenges = bucket.lock().await;
        Ok(challenges.last().cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
    ) -> Result<bool> {
        let Some(bucket) = self.bucket_for_id(id).await else {
            return Ok(false);
        };
        let mut challenges = bucket.lock().await;
        match challenges.iter_mut().rev().find(|c| c.id == id) {
            Some(challenge) if challenge.status == from => {
                challenge.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_failed_attempt(&self, id: Uuid) -> Result<Option<u32>> {
        let Some(bucket) = self.bucket_for_id(id).await else {
            return Ok(None);
        };
        let mut challenges = bucket.lock().await;
        match challenges.iter_mut().rev().find(|c| c.id == id) {
            Some(challenge) if challenge.status == ChallengeStatus::Pending => {
                challenge.attempt_count += 1;
                Ok(Some(challenge.attempt_count))
            }
            _ => Ok(None),
        }
    }

    async fn stale_pending(&self, now: DateTime<Utc>) -> Result<Vec<(Uuid, PhoneNumber)>> {
        let mut stale = Vec::new();
        for bucket in self.snapshot().await {
            let challenges = bucket.lock().await;
            stale.extend(
                challenges
                    .iter()
                    .filter(|c| c.status == ChallengeStatus::Pending && c.is_expired_at(now))
                    .map(|c| (c.id, c.phone.clone())),
            );
        }
        Ok(stale)
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut purged = Vec::new();
        for bucket in self.snapshot().await {
            let mut challenges = bucket.lock().await;
            challenges.retain(|c| {
                let remove = c.status.is_terminal() && c.expires_at < before;
                if remove {
                    purged.push(c.id);
                }
                !remove
            });
        }

        if !purged.is_empty() {
            let mut index = self.index.write().await;
            for id in &purged {
                index.remove(id);
            }
        }

        // Buckets busy with another operation are left for the next purge
        self.buckets
            .write()
            .await
            .retain(|_, bucket| bucket.try_lock().map(|c| !c.is_empty()).unwrap_or(true));

        Ok(purged.len() as u64)
    }

    async fn count_pending(&self, phone: &PhoneNumber) -> Result<usize> {
        let Some(bucket) = self.bucket(phone).await else {
            return Ok(0);
        };
        let challenges = bucket.lock().await;
        Ok(challenges
            .iter()
            .filter(|c| c.status == ChallengeStatus::Pending)
            .count())
    }
}
