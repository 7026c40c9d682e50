//! Record store contract used by the duplicate detection core
//!
//! The core never touches SQL directly: it receives a `RecordStore` handle
//! and relies on the store's UNIQUE constraint on content hash for
//! cross-request coordination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::{
    BlockedDuplicateRepository, FileRecord, FileRepository, NewBlockedDuplicate, NewFileRecord,
};
use super::types::DedupError;

/// Queries and mutations the duplicate detection core needs
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_etag_and_length(
        &self,
        etag: &str,
        content_length: i64,
    ) -> Result<Option<FileRecord>, DedupError>;

    async fn find_by_original_url(&self, url: &str) -> Result<Option<FileRecord>, DedupError>;

    /// First record with this exact name, in insertion order
    async fn find_first_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Option<FileRecord>, DedupError>;

    async fn find_by_content_hash(
        &self,
        file_hash: &str,
    ) -> Result<Option<FileRecord>, DedupError>;

    /// Bytes registered by `user_id` in `[since, until]`, saturating at `i64::MAX`
    async fn sum_content_length_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, DedupError>;

    /// Persist a new record.
    ///
    /// Returns `DedupError::HashConflict` when the content hash is taken.
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord, DedupError>;

    async fn insert_audit(&self, audit: &NewBlockedDuplicate) -> Result<(), DedupError>;
}

/// `RecordStore` backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_by_etag_and_length(
        &self,
        etag: &str,
        content_length: i64,
    ) -> Result<Option<FileRecord>, DedupError> {
        Ok(FileRepository::new(&self.pool)
            .find_by_etag_and_length(etag, content_length)
            .await?)
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<FileRecord>, DedupError> {
        Ok(FileRepository::new(&self.pool).find_by_original_url(url).await?)
    }

    async fn find_first_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Option<FileRecord>, DedupError> {
        Ok(FileRepository::new(&self.pool)
            .find_first_by_file_name(file_name)
            .await?)
    }

    async fn find_by_content_hash(
        &self,
        file_hash: &str,
    ) -> Result<Option<FileRecord>, DedupError> {
        Ok(FileRepository::new(&self.pool)
            .find_by_content_hash(file_hash)
            .await?)
    }

    async fn sum_content_length_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, DedupError> {
        Ok(FileRepository::new(&self.pool)
            .sum_content_length_between(user_id, since, until)
            .await?)
    }

    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord, DedupError> {
        Ok(FileRepository::new(&self.pool).insert(record).await?)
    }

    async fn insert_audit(&self, audit: &NewBlockedDuplicate) -> Result<(), DedupError> {
        BlockedDuplicateRepository::new(&self.pool).insert(audit).await?;
        Ok(())
    }
}
