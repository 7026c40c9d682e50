//! Registration Workflow
//!
//! quota check -> metadata dedup -> fingerprint -> hash dedup -> insert.
//!
//! No locks are held here. Two writers racing on the same content hash are
//! settled by the store's UNIQUE constraint; the loser re-reads by hash and
//! returns the winner's record.

use chrono::Utc;
use std::sync::Arc;

use crate::db::NewFileRecord;
use super::fingerprint::Fingerprinter;
use super::quota::QuotaAccountant;
use super::resolver::DuplicateResolver;
use super::store::RecordStore;
use super::types::{DedupError, LogFileRequest, Registration};

/// Orchestrates registration of a reported download
#[derive(Clone)]
pub struct RegistrationWorkflow {
    store: Arc<dyn RecordStore>,
    resolver: DuplicateResolver,
    quota: QuotaAccountant,
    fingerprinter: Fingerprinter,
}

impl RegistrationWorkflow {
    pub fn new(
        store: Arc<dyn RecordStore>,
        resolver: DuplicateResolver,
        quota: QuotaAccountant,
        fingerprinter: Fingerprinter,
    ) -> Self {
        Self {
            store,
            resolver,
            quota,
            fingerprinter,
        }
    }

    /// Register a download, or return the record it duplicates.
    ///
    /// The request is normalized here as well, so the content hash is always
    /// stored and looked up as lowercase hex whatever the caller passed.
    pub async fn register(&self, request: &LogFileRequest) -> Result<Registration, DedupError> {
        let request = &request.clone().normalized()?;
        self.check_quota(request).await;

        if let Some(found) = self.resolver.resolve(&request.candidate()).await? {
            tracing::info!(
                file_id = %found.record.id,
                signal = found.signal.as_str(),
                "File is a duplicate, not logging again"
            );
            return Ok(Registration::MetadataDeduped(found));
        }

        // Hashing runs with no store transaction open.
        let (file_hash, file_signature) = match (&request.file_hash, &request.local_storage_path) {
            (Some(hash), _) => (Some(hash.clone()), None),
            (None, Some(path)) => match self.fingerprinter.fingerprint(path).await {
                Some(fp) => (Some(fp.content_hash), Some(fp.signature)),
                None => (None, None),
            },
            (None, None) => (None, None),
        };

        if let Some(hash) = &file_hash {
            if let Some(found) = self.resolver.resolve_by_hash(hash).await? {
                tracing::info!(
                    file_id = %found.record.id,
                    file_hash = %hash,
                    "Duplicate found by content hash, not logging again"
                );
                return Ok(Registration::HashDeduped(found.record));
            }
        }

        let new_record = NewFileRecord {
            original_url: request.original_url.clone(),
            file_name: request.file_name.clone(),
            desktop_id: request.desktop_id.clone(),
            local_storage_path: request.local_storage_path.clone(),
            etag: request.etag.clone(),
            content_length: request.content_length,
            file_hash: file_hash.clone(),
            file_signature,
            user_id: request.user_id.clone(),
            created_at: Utc::now(),
        };

        match self.store.insert(&new_record).await {
            Ok(record) => {
                tracing::info!(
                    file_id = %record.id,
                    file_name = %record.file_name,
                    file_hash = ?record.file_hash,
                    "Registered new file"
                );
                Ok(Registration::Persisted(record))
            }
            Err(DedupError::HashConflict(reason)) => {
                tracing::warn!(
                    file_hash = ?file_hash,
                    reason = %reason,
                    "Content hash registered concurrently, recovering"
                );
                self.recover_conflict(file_hash.as_deref()).await
            }
            Err(e) => Err(e),
        }
    }

    /// Return whichever record won the race on `file_hash`
    async fn recover_conflict(&self, file_hash: Option<&str>) -> Result<Registration, DedupError> {
        let Some(hash) = file_hash else {
            tracing::error!("Insert conflicted without a content hash");
            return Ok(Registration::Failed);
        };

        match self.store.find_by_content_hash(hash).await? {
            Some(record) => {
                tracing::info!(file_id = %record.id, "Recovered concurrently registered file");
                Ok(Registration::ConflictRecovered(record))
            }
            None => {
                tracing::error!(file_hash = %hash, "Conflicting record vanished, registration failed");
                Ok(Registration::Failed)
            }
        }
    }

    /// Advisory only: a breach is logged and the registration proceeds.
    async fn check_quota(&self, request: &LogFileRequest) {
        let Some(length) = request.content_length else {
            return;
        };
        let Some(user_id) = &request.user_id else {
            tracing::debug!(
                file_name = %request.file_name,
                content_length = length,
                "Anonymous registration, quota not checked"
            );
            return;
        };

        match self.quota.is_exceeded(user_id, length).await {
            Ok(true) => tracing::warn!(
                user_id = %user_id,
                content_length = length,
                daily_limit = self.quota.daily_limit(),
                "Daily quota exceeded"
            ),
            Ok(false) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Quota check failed"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
