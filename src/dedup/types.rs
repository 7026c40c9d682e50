//! Request, response and outcome types for duplicate detection

use serde::{Deserialize, Serialize};

use crate::db::FileRecord;
use crate::error::AppError;

// ============================================================================
// Constants
// ============================================================================

/// Longest origin URL a record may carry
pub const MAX_URL_LENGTH: usize = 2048;

/// Length of a hex-rendered SHA-256 digest
pub const CONTENT_HASH_HEX_LEN: usize = 64;

// ============================================================================
// Candidate
// ============================================================================

/// Metadata describing a file that may already be known.
///
/// Every field is optional; an absent field means that signal is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub etag: Option<String>,
    pub content_length: Option<i64>,
    pub original_url: Option<String>,
    pub file_name: Option<String>,
}

// ============================================================================
// Check Types
// ============================================================================

/// Request to check whether a download would be a duplicate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckRequest {
    #[serde(default)]
    pub original_url: Option<String>,

    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub content_length: Option<i64>,

    #[serde(default)]
    pub file_name: Option<String>,

    /// Requesting user, recorded in the audit trail
    #[serde(default, rename = "downloaderId", alias = "userId")]
    pub user_id: Option<String>,
}

impl DuplicateCheckRequest {
    /// Blank fields become absent; rejects out-of-range values
    pub fn normalized(self) -> Result<Self, DedupError> {
        let request = Self {
            original_url: non_blank(self.original_url),
            etag: non_blank(self.etag),
            content_length: self.content_length,
            file_name: non_blank(self.file_name),
            user_id: non_blank(self.user_id),
        };
        validate_url(request.original_url.as_deref())?;
        validate_length(request.content_length)?;
        Ok(request)
    }

    pub fn candidate(&self) -> DuplicateCandidate {
        DuplicateCandidate {
            etag: self.etag.clone(),
            content_length: self.content_length,
            original_url: self.original_url.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

/// Result of a duplicate check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResponse {
    pub is_duplicate: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileRecord>,
}

impl DuplicateCheckResponse {
    pub fn duplicate(existing: FileRecord) -> Self {
        Self {
            is_duplicate: true,
            file_info: Some(existing),
        }
    }

    pub fn not_a_duplicate() -> Self {
        Self {
            is_duplicate: false,
            file_info: None,
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Request to register a completed (or starting) download
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileRequest {
    #[serde(default)]
    pub original_url: Option<String>,

    /// Required; an absent name deserializes empty and fails `normalized()`
    #[serde(default)]
    pub file_name: String,

    /// SHA-256 of the content, when the client already computed it
    #[serde(default)]
    pub file_hash: Option<String>,

    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub content_length: Option<i64>,

    /// Where the file landed on the reporting machine
    #[serde(default)]
    pub local_storage_path: Option<String>,

    #[serde(default, rename = "downloaderId", alias = "userId")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub desktop_id: Option<String>,
}

impl LogFileRequest {
    /// Blank fields become absent, the hash is lowercased; rejects invalid values
    pub fn normalized(self) -> Result<Self, DedupError> {
        let file_name = self.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(DedupError::InvalidRequest("fileName is required".to_string()));
        }

        let file_hash = match non_blank(self.file_hash) {
            Some(hash) => Some(normalize_hash(&hash)?),
            None => None,
        };

        let request = Self {
            original_url: non_blank(self.original_url),
            file_name,
            file_hash,
            etag: non_blank(self.etag),
            content_length: self.content_length,
            local_storage_path: non_blank(self.local_storage_path),
            user_id: non_blank(self.user_id),
            desktop_id: non_blank(self.desktop_id),
        };
        validate_url(request.original_url.as_deref())?;
        validate_length(request.content_length)?;
        Ok(request)
    }

    pub fn candidate(&self) -> DuplicateCandidate {
        DuplicateCandidate {
            etag: self.etag.clone(),
            content_length: self.content_length,
            original_url: self.original_url.clone(),
            file_name: Some(self.file_name.clone()),
        }
    }
}

// ============================================================================
// Match Types
// ============================================================================

/// Which identity signal produced a match, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    /// Same SHA-256 of the full content
    ContentHash,
    /// Same server-asserted (etag, content length) pair
    TransportIdentity,
    /// Same origin URL
    OriginUrl,
    /// Same display name
    FileName,
    /// Same display name once a " (N)" copy suffix is removed
    CopySuffixName,
}

impl MatchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentHash => "content_hash",
            Self::TransportIdentity => "transport_identity",
            Self::OriginUrl => "origin_url",
            Self::FileName => "file_name",
            Self::CopySuffixName => "copy_suffix_name",
        }
    }
}

/// An existing record together with the signal that matched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub record: FileRecord,
    pub signal: MatchSignal,
}

// ============================================================================
// Registration Outcome
// ============================================================================

/// Terminal state of a single registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new record was written
    Persisted(FileRecord),
    /// The metadata cascade found an existing record
    MetadataDeduped(DuplicateMatch),
    /// The content hash identified an existing record
    HashDeduped(FileRecord),
    /// A concurrent writer inserted the same hash first; this is its record
    ConflictRecovered(FileRecord),
    /// The insert conflicted but the winning record could not be found
    Failed,
}

impl Registration {
    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            Self::Persisted(record) | Self::HashDeduped(record) | Self::ConflictRecovered(record) => {
                Some(record)
            }
            Self::MetadataDeduped(found) => Some(&found.record),
            Self::Failed => None,
        }
    }

    pub fn into_record(self) -> Option<FileRecord> {
        match self {
            Self::Persisted(record) | Self::HashDeduped(record) | Self::ConflictRecovered(record) => {
                Some(record)
            }
            Self::MetadataDeduped(found) => Some(found.record),
            Self::Failed => None,
        }
    }

    /// Whether this call created the record
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Persisted(_) => "persisted",
            Self::MetadataDeduped(_) => "metadata_deduped",
            Self::HashDeduped(_) => "hash_deduped",
            Self::ConflictRecovered(_) => "conflict_recovered",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Duplicate detection error types
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content hash already registered: {0}")]
    HashConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DedupError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::HashConflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::HashConflict(_) => "HASH_CONFLICT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AppError> for DedupError {
    fn from(err: AppError) -> Self {
        if err.is_unique_violation() {
            return DedupError::HashConflict(err.to_string());
        }
        match err {
            AppError::Database(e) => DedupError::DatabaseError(e.to_string()),
            other => DedupError::InternalError(other.to_string()),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_url(url: Option<&str>) -> Result<(), DedupError> {
    match url {
        Some(url) if url.chars().count() > MAX_URL_LENGTH => Err(DedupError::InvalidRequest(
            format!("originalUrl exceeds {} characters", MAX_URL_LENGTH),
        )),
        _ => Ok(()),
    }
}

fn validate_length(content_length: Option<i64>) -> Result<(), DedupError> {
    match content_length {
        Some(len) if len < 0 => Err(DedupError::InvalidRequest(format!(
            "contentLength must not be negative (got {})",
            len
        ))),
        _ => Ok(()),
    }
}

/// Lowercase a client-supplied SHA-256 hex digest, rejecting anything else
pub fn normalize_hash(hash: &str) -> Result<String, DedupError> {
    let hash = hash.trim().to_ascii_lowercase();
    let is_digest = hash.len() == CONTENT_HASH_HEX_LEN && hex::decode(&hash).is_ok();
    if !is_digest {
        return Err(DedupError::InvalidRequest(format!(
            "fileHash must be {} hex characters",
            CONTENT_HASH_HEX_LEN
        )));
    }
    Ok(hash)
}

// ============================================================================
// Tests
// ============================================================================
