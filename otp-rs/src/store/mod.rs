//! Challenge persistence
//!
//! - [`memory`]: in-process store for tests and single-node deployments
//! - [`sqlite`]: SQLite-backed store
//!
//! Status changes are compare-and-swap: a transition only applies when the
//! row is still in the expected state, so a concurrent writer can never be
//! overwritten silently.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::challenge::{Challenge, ChallengeStatus};
use crate::error::Result;
use crate::phone::PhoneNumber;

pub use memory::MemoryChallengeStore;
pub use sqlite::SqliteChallengeStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Persist a newly issued challenge
    async fn insert(&self, challenge: &Challenge) -> Result<()>;

    /// Most recently issued challenge for a phone, in any status
    async fn current(&self, phone: &PhoneNumber) -> Result<Option<Challenge>>;

    /// Move `id` from `from` to `to`; false when the row was not in `from`
    async fn transition(&self, id: Uuid, from: ChallengeStatus, to: ChallengeStatus)
        -> Result<bool>;

    /// Increment the attempt counter of a pending challenge.
    ///
    /// Returns the new count, or `None` if the challenge is no longer pending.
    async fn record_failed_attempt(&self, id: Uuid) -> Result<Option<u32>>;

    /// Pending challenges whose window closed before `now`
    async fn stale_pending(&self, now: DateTime<Utc>) -> Result<Vec<(Uuid, PhoneNumber)>>;

    /// Delete terminal challenges that expired before `before`
    async fn purge_terminal(&self, before: DateTime<Utc>) -> Result<u64>;

    /// Number of pending challenges for a phone
    async fn count_pending(&self, phone: &PhoneNumber) -> Result<usize>;
}
