use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::ChallengeStore;
use crate::challenge::{Challenge, ChallengeStatus};
use crate::code::OtpCode;
use crate::error::{OtpError, Result};
use crate::phone::PhoneNumber;

type ChallengeRow = (String, String, String, String, String, i64, String);

/// SQLite-backed challenge store
#[derive(Clone)]
pub struct SqliteChallengeStore {
    db: SqlitePool,
}

impl SqliteChallengeStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS otp_challenges (
                id TEXT PRIMARY KEY,
                phone TEXT NOT NULL,
                code TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                attempt_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_otp_phone_created ON otp_challenges(phone, created_at)",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_otp_status_expires ON otp_challenges(status, expires_at)",
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Fixed-width RFC 3339 so lexical order matches time order
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| OtpError::Storage(format!("invalid timestamp '{}': {}", value, e)))
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| OtpError::Storage(format!("invalid id '{}': {}", value, e)))
}

fn from_row(row: ChallengeRow) -> Result<Challenge> {
    let (id, phone, code, created_at, expires_at, attempt_count, status) = row;
    Ok(Challenge {
        id: parse_id(&id)?,
        phone: PhoneNumber::from_normalized(phone),
        code: OtpCode::from_stored(code),
        created_at: parse_ts(&created_at)?,
        expires_at: parse_ts(&expires_at)?,
        attempt_count: u32::try_from(attempt_count).unwrap_or(u32::MAX),
        status: status.parse().map_err(OtpError::Storage)?,
    })
}

#[async_trait]
impl ChallengeStore for SqliteChallengeStore {
    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_challenges (id, phone, code, created_at, expires_at, attempt_count, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(challenge.id.to_string())
        .bind(challenge.phone.as_str())
        .bind(challenge.code.as_str())
        .bind(ts(challenge.created_at))
        .bind(ts(challenge.expires_at))
        .bind(i64::from(challenge.attempt_count))
        .bind(challenge.status.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn current(&self, phone: &PhoneNumber) -> Result<Option<Challenge>> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, phone, code, created_at, expires_at, attempt_count, status
            FROM otp_challenges
            WHERE phone = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(phone.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(from_row).transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE otp_challenges SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failed_attempt(&self, id: Uuid) -> Result<Option<u32>> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE otp_challenges
            SET attempt_count = attempt_count + 1
            WHERE id = ? AND status = 'pending'
            RETURNING attempt_count
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(count.map(|c| u32::try_from(c).unwrap_or(u32::MAX)))
    }

    async fn stale_pending(&self, now: DateTime<Utc>) -> Result<Vec<(Uuid, PhoneNumber)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, phone FROM otp_challenges WHERE status = 'pending' AND expires_at < ?",
        )
        .bind(ts(now))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(id, phone)| Ok((parse_id(&id)?, PhoneNumber::from_normalized(phone))))
            .collect()
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM otp_challenges WHERE status != 'pending' AND expires_at < ?")
                .bind(ts(before))
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected())
    }

    async fn count_pending(&self, phone: &PhoneNumber) -> Result<usize> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM otp_challenges WHERE phone = ? AND status = 'pending'",
        )
        .bind(phone.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(count.0 as usize)
    }
}
