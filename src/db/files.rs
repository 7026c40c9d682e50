//! Downloaded file database operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::format_timestamp;
use crate::error::Result;

/// Downloaded file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub original_url: Option<String>,
    pub file_name: String,
    pub desktop_id: Option<String>,
    pub local_storage_path: Option<String>,
    pub etag: Option<String>,
    pub content_length: Option<i64>,
    pub file_hash: Option<String>,
    pub file_signature: Option<String>,
    #[serde(rename = "downloaderId")]
    pub user_id: Option<String>,
    pub created_at: String,
}

/// Fields of a record about to be inserted; identity is assigned on insert
#[derive(Debug, Clone, Default)]
pub struct NewFileRecord {
    pub original_url: Option<String>,
    pub file_name: String,
    pub desktop_id: Option<String>,
    pub local_storage_path: Option<String>,
    pub etag: Option<String>,
    pub content_length: Option<i64>,
    pub file_hash: Option<String>,
    pub file_signature: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

const FILE_COLUMNS: &str = "id, original_url, file_name, desktop_id, local_storage_path, \
     etag, content_length, file_hash, file_signature, user_id, created_at";

/// File record repository
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_etag_and_length(
        &self,
        etag: &str,
        content_length: i64,
    ) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             WHERE etag = ? AND content_length = ? \
             ORDER BY created_at ASC, rowid ASC LIMIT 1"
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(etag)
            .bind(content_length)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    pub async fn find_by_original_url(&self, url: &str) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             WHERE original_url = ? \
             ORDER BY created_at ASC, rowid ASC LIMIT 1"
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    /// First record with exactly this name, in insertion order
    pub async fn find_first_by_file_name(&self, file_name: &str) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             WHERE file_name = ? \
             ORDER BY created_at ASC, rowid ASC LIMIT 1"
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(file_name)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    pub async fn find_by_content_hash(&self, file_hash: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM downloaded_files WHERE file_hash = ?");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(file_hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    /// Sum of content lengths registered by a user in `[since, until]`.
    ///
    /// `TOTAL` is summed as a float so a huge window saturates instead of
    /// raising an integer overflow. Zero when nothing counts.
    pub async fn sum_content_length_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64> {
        let total = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT TOTAL(content_length) FROM downloaded_files
            WHERE user_id = ? AND created_at >= ? AND created_at <= ?
            "#,
        )
        .bind(user_id)
        .bind(format_timestamp(since))
        .bind(format_timestamp(until))
        .fetch_one(self.pool)
        .await?;

        // Float to int casts saturate at i64::MAX.
        Ok(total as i64)
    }

    /// Insert a new record, returning it with its assigned identity.
    ///
    /// Fails with a UNIQUE violation when `file_hash` is already taken.
    pub async fn insert(&self, data: &NewFileRecord) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(data.created_at);

        sqlx::query(
            r#"
            INSERT INTO downloaded_files (id, original_url, file_name, desktop_id, local_storage_path,
                                          etag, content_length, file_hash, file_signature, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.original_url)
        .bind(&data.file_name)
        .bind(&data.desktop_id)
        .bind(&data.local_storage_path)
        .bind(&data.etag)
        .bind(data.content_length)
        .bind(&data.file_hash)
        .bind(&data.file_signature)
        .bind(&data.user_id)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(FileRecord {
            id,
            original_url: data.original_url.clone(),
            file_name: data.file_name.clone(),
            desktop_id: data.desktop_id.clone(),
            local_storage_path: data.local_storage_path.clone(),
            etag: data.etag.clone(),
            content_length: data.content_length,
            file_hash: data.file_hash.clone(),
            file_signature: data.file_signature.clone(),
            user_id: data.user_id.clone(),
            created_at,
        })
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM downloaded_files")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_distinct_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id) FROM downloaded_files",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Most recent records, newest first
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// Every record, newest first
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files ORDER BY created_at DESC, rowid DESC"
        );
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// Case-insensitive substring search over file name and user id
    pub async fn search(&self, query: &str) -> Result<Vec<FileRecord>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             WHERE lower(file_name) LIKE ?1 ESCAPE '\\' \
                OR lower(COALESCE(user_id, '')) LIKE ?1 ESCAPE '\\' \
             ORDER BY created_at DESC, rowid DESC"
        );
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(pattern)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// Records created strictly before `cutoff`, oldest first
    pub async fn list_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM downloaded_files \
             WHERE created_at < ? ORDER BY created_at ASC, rowid ASC"
        );
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(format_timestamp(cutoff))
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
