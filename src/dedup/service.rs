//! Deduplication Service
//!
//! The two inbound operations: a read-only duplicate check (which also
//! leaves a best-effort audit entry on a hit) and full registration.

use chrono::Utc;
use std::sync::Arc;

use crate::config::DedupConfig;
use crate::db::{NewBlockedDuplicate, UNKNOWN_USER};
use super::fingerprint::Fingerprinter;
use super::quota::{QuotaAccountant, QuotaStatus};
use super::registration::RegistrationWorkflow;
use super::resolver::DuplicateResolver;
use super::store::RecordStore;
use super::types::{
    DedupError, DuplicateCheckRequest, DuplicateCheckResponse, DuplicateMatch, LogFileRequest,
    Registration,
};

/// Entry point for duplicate checks and file registration
#[derive(Clone)]
pub struct DeduplicationService {
    inner: Arc<DeduplicationServiceInner>,
}

struct DeduplicationServiceInner {
    store: Arc<dyn RecordStore>,
    resolver: DuplicateResolver,
    quota: QuotaAccountant,
    workflow: RegistrationWorkflow,
}

impl DeduplicationService {
    /// Create a service over `store` using the given settings
    pub fn new(store: Arc<dyn RecordStore>, config: &DedupConfig) -> Self {
        let resolver =
            DuplicateResolver::new(store.clone()).with_smart_name_match(config.smart_name_match);
        let quota = QuotaAccountant::new(store.clone(), config.daily_quota_bytes);
        let workflow = RegistrationWorkflow::new(
            store.clone(),
            resolver.clone(),
            quota.clone(),
            Fingerprinter::new(config.hash_chunk_size),
        );

        Self {
            inner: Arc::new(DeduplicationServiceInner {
                store,
                resolver,
                quota,
                workflow,
            }),
        }
    }

    /// Check whether a download would duplicate a known file
    pub async fn check_duplicate(
        &self,
        request: &DuplicateCheckRequest,
    ) -> Result<DuplicateCheckResponse, DedupError> {
        match self.inner.resolver.resolve(&request.candidate()).await? {
            Some(found) => {
                self.record_blocked(request, &found).await;
                Ok(DuplicateCheckResponse::duplicate(found.record))
            }
            None => Ok(DuplicateCheckResponse::not_a_duplicate()),
        }
    }

    /// Register a download through the full workflow
    pub async fn log_file(&self, request: &LogFileRequest) -> Result<Registration, DedupError> {
        self.inner.workflow.register(request).await
    }

    pub async fn quota_status(&self, user_id: &str) -> Result<QuotaStatus, DedupError> {
        self.inner.quota.status(user_id).await
    }

    /// Failures are logged and swallowed.
    async fn record_blocked(&self, request: &DuplicateCheckRequest, found: &DuplicateMatch) {
        let audit = NewBlockedDuplicate {
            file_name: request
                .file_name
                .clone()
                .unwrap_or_else(|| found.record.file_name.clone()),
            file_size: found.record.content_length.unwrap_or(0),
            user_id: request
                .user_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            blocked_at: Utc::now(),
            original_file_id: found.record.id.clone(),
        };

        match self.inner.store.insert_audit(&audit).await {
            Ok(()) => tracing::info!(
                file_name = %audit.file_name,
                original_file_id = %audit.original_file_id,
                "Blocked duplicate logged"
            ),
            Err(e) => tracing::error!(
                file_name = %audit.file_name,
                error = %e,
                "Failed to log blocked duplicate"
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, BlockedDuplicateRepository, FileRecord, NewFileRecord};
    use crate::dedup::store::SqliteRecordStore;
    use async_trait::async_trait;
    use chrono::DateTime;
    use tempfile::TempDir;

    async fn setup(dir: &TempDir) -> (Arc<SqliteRecordStore>, DeduplicationService) {
        let url = format!("sqlite:{}", dir.path().join("service.db").display());
        let store = Arc::new(SqliteRecordStore::new(create_pool(&url).await.unwrap()));
        let service = DeduplicationService::new(store.clone(), &DedupConfig::default());
        (store, service)
    }

    /// Delegates everything but refuses audit writes
    struct NoAuditStore(Arc<SqliteRecordStore>);

    #[async_trait]
    impl RecordStore for NoAuditStore {
        async fn find_by_etag_and_length(&self, etag: &str, len: i64) -> Result<Option<FileRecord>, DedupError> {
            self.0.find_by_etag_and_length(etag, len).await
        }

        async fn find_by_original_url(&self, url: &str) -> Result<Option<FileRecord>, DedupError> {
            self.0.find_by_original_url(url).await
        }

        async fn find_first_by_file_name(&self, name: &str) -> Result<Option<FileRecord>, DedupError> {
            self.0.find_first_by_file_name(name).await
        }

        async fn find_by_content_hash(&self, hash: &str) -> Result<Option<FileRecord>, DedupError> {
            self.0.find_by_content_hash(hash).await
        }

        async fn sum_content_length_between(
            &self,
            user: &str,
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<i64, DedupError> {
            self.0.sum_content_length_between(user, since, until).await
        }

        async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord, DedupError> {
            self.0.insert(record).await
        }

        async fn insert_audit(&self, _audit: &NewBlockedDuplicate) -> Result<(), DedupError> {
            Err(DedupError::DatabaseError("audit table is read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_check_miss_writes_no_audit() {
        let dir = TempDir::new().unwrap();
        let (store, service) = setup(&dir).await;

        let response = service
            .check_duplicate(&DuplicateCheckRequest {
                file_name: Some("fresh.zip".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!response.is_duplicate);
        assert!(response.file_info.is_none());
        let totals = BlockedDuplicateRepository::new(store.pool()).totals().await.unwrap();
        assert_eq!(totals.count, 0);
    }

    #[tokio::test]
    async fn test_check_hit_audits_existing_size_and_unknown_user() {
        let dir = TempDir::new().unwrap();
        let (store, service) = setup(&dir).await;

        let logged = service
            .log_file(&LogFileRequest {
                original_url: Some("https://dl/tool.msi".to_string()),
                file_name: "tool.msi".to_string(),
                content_length: Some(4096),
                ..Default::default()
            })
            .await
            .unwrap()
            .into_record()
            .unwrap();

        let response = service
            .check_duplicate(&DuplicateCheckRequest {
                original_url: Some("https://dl/tool.msi".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.is_duplicate);
        assert_eq!(response.file_info.unwrap().id, logged.id);

        let entries = BlockedDuplicateRepository::new(store.pool())
            .list_for_file(&logged.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_size, 4096);
        assert_eq!(entries[0].user_id, UNKNOWN_USER);
        assert_eq!(entries[0].file_name, "tool.msi");
    }

    #[tokio::test]
    async fn test_check_succeeds_when_audit_write_fails() {
        let dir = TempDir::new().unwrap();
        let (store, _) = setup(&dir).await;
        store
            .insert(&NewFileRecord {
                file_name: "movie.mkv".to_string(),
                created_at: Utc::now(),
                ..Default::default()
            })
            .await
            .unwrap();

        let service =
            DeduplicationService::new(Arc::new(NoAuditStore(store)), &DedupConfig::default());
        let response = service
            .check_duplicate(&DuplicateCheckRequest {
                file_name: Some("movie.mkv".to_string()),
                user_id: Some("kim".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.is_duplicate);
    }

    #[tokio::test]
    async fn test_log_path_never_audits() {
        let dir = TempDir::new().unwrap();
        let (store, service) = setup(&dir).await;
        let request = LogFileRequest {
            file_name: "twice.txt".to_string(),
            ..Default::default()
        };

        service.log_file(&request).await.unwrap();
        let second = service.log_file(&request).await.unwrap();

        assert!(!second.is_new());
        let totals = BlockedDuplicateRepository::new(store.pool()).totals().await.unwrap();
        assert_eq!(totals.count, 0);
    }

    #[tokio::test]
    async fn test_quota_status_reflects_registrations() {
        let dir = TempDir::new().unwrap();
        let (_store, service) = setup(&dir).await;

        service
            .log_file(&LogFileRequest {
                file_name: "a.bin".to_string(),
                content_length: Some(1_000),
                user_id: Some("lee".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let status = service.quota_status("lee").await.unwrap();
        assert_eq!(status.used_bytes, 1_000);
        assert_eq!(status.used_bytes + status.remaining_bytes, status.daily_limit_bytes);
    }
}
