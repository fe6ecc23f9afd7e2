use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{Profile, ProfileSource};
use crate::error::{GateError, Result};
use crate::session::UserId;

/// SQLite-backed profile source
#[derive(Clone)]
pub struct SqliteProfileSource {
    db: SqlitePool,
}

impl SqliteProfileSource {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                onboarding_completed INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Create or replace a profile
    pub async fn upsert(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, role, onboarding_completed, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                onboarding_completed = excluded.onboarding_completed,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.user_id.to_string())
        .bind(&profile.role)
        .bind(profile.onboarding_completed)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, (String, String, bool)>(
            "SELECT user_id, role, onboarding_completed FROM profiles WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.map(|(id, role, onboarding_completed)| {
            let user_id = Uuid::parse_str(&id)
                .map_err(|e| GateError::Storage(format!("invalid user id '{}': {}", id, e)))?;
            Ok(Profile {
                user_id,
                role,
                onboarding_completed,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ProfileSource for SqliteProfileSource {
    async fn fetch(&self, user_id: UserId) -> anyhow::Result<Option<Profile>> {
        Ok(self.load(user_id).await?)
    }
}
