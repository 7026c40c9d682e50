//! Blocked duplicate audit operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::format_timestamp;
use crate::error::Result;

/// Requester id recorded when a duplicate check arrives without one
pub const UNKNOWN_USER: &str = "unknown";

/// Audit record of a download that was reported as a duplicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDuplicate {
    pub id: String,
    pub file_name: String,
    pub file_size: i64,
    pub user_id: String,
    pub blocked_at: String,
    pub original_file_id: String,
}

/// Fields of an audit record about to be written
#[derive(Debug, Clone)]
pub struct NewBlockedDuplicate {
    pub file_name: String,
    /// Size of the matched existing record, not of the rejected request
    pub file_size: i64,
    pub user_id: String,
    pub blocked_at: DateTime<Utc>,
    pub original_file_id: String,
}

/// Totals across the audit trail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct BlockedTotals {
    pub count: i64,
    pub bytes_saved: i64,
}

/// Blocked duplicate repository
pub struct BlockedDuplicateRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BlockedDuplicateRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, data: &NewBlockedDuplicate) -> Result<BlockedDuplicate> {
        let id = Uuid::new_v4().to_string();
        let blocked_at = format_timestamp(data.blocked_at);

        sqlx::query(
            r#"
            INSERT INTO blocked_duplicates (id, file_name, file_size, user_id, blocked_at, original_file_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.file_name)
        .bind(data.file_size)
        .bind(&data.user_id)
        .bind(&blocked_at)
        .bind(&data.original_file_id)
        .execute(self.pool)
        .await?;

        Ok(BlockedDuplicate {
            id,
            file_name: data.file_name.clone(),
            file_size: data.file_size,
            user_id: data.user_id.clone(),
            blocked_at,
            original_file_id: data.original_file_id.clone(),
        })
    }

    /// Audit entries pointing at one file record, oldest first
    pub async fn list_for_file(&self, original_file_id: &str) -> Result<Vec<BlockedDuplicate>> {
        let entries = sqlx::query_as::<_, BlockedDuplicate>(
            r#"
            SELECT id, file_name, file_size, user_id, blocked_at, original_file_id
            FROM blocked_duplicates
            WHERE original_file_id = ?
            ORDER BY blocked_at ASC
            "#,
        )
        .bind(original_file_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Number of blocked downloads and the bytes they would have re-fetched
    pub async fn totals(&self) -> Result<BlockedTotals> {
        let totals = sqlx::query_as::<_, BlockedTotals>(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(file_size), 0) AS bytes_saved
            FROM blocked_duplicates
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(totals)
    }
}
