//! Dashboard Routes
//!
//! Read-only aggregate views over the record store and the blocked-duplicate
//! audit trail.
//!
//! Endpoints:
//! - GET /api/dashboard/stats - Totals plus the five most recent downloads
//! - GET /api/dashboard/search?query= - Match file name or user id
//! - GET /api/dashboard/history - Every record, newest first

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{BlockedDuplicateRepository, FileRecord, FileRepository};
use crate::error::Result;
use crate::state::AppState;

const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Create the dashboard router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/search", get(search))
        .route("/history", get(history))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_downloads: i64,
    pub active_users: i64,
    pub duplicates_blocked: i64,
    pub storage_saved_bytes: i64,
    /// Human readable form of `storage_saved_bytes`
    pub storage_saved: String,
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: String,
    pub file_name: String,
    pub downloader_id: Option<String>,
    pub content_length: Option<i64>,
    pub created_at: String,
}

impl From<FileRecord> for RecentActivity {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            downloader_id: record.user_id,
            content_length: record.content_length,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/dashboard/stats
async fn get_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    let files = FileRepository::new(state.db());
    let blocked = BlockedDuplicateRepository::new(state.db()).totals().await?;

    let recent_activity = files
        .list_recent(RECENT_ACTIVITY_LIMIT)
        .await?
        .into_iter()
        .map(RecentActivity::from)
        .collect();

    Ok(Json(DashboardStats {
        total_downloads: files.count().await?,
        active_users: files.count_distinct_users().await?,
        duplicates_blocked: blocked.count,
        storage_saved_bytes: blocked.bytes_saved,
        storage_saved: format_size(blocked.bytes_saved),
        recent_activity,
    }))
}

/// GET /api/dashboard/search?query=
///
/// An empty query returns an empty list rather than everything.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<FileRecord>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    tracing::debug!(query = %query, "Dashboard search");
    let results = FileRepository::new(state.db()).search(query).await?;
    Ok(Json(results))
}

/// GET /api/dashboard/history
async fn history(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>> {
    let records = FileRepository::new(state.db()).list_all().await?;
    Ok(Json(records))
}

/// Format a byte count with binary units
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = 1024 * KB;
    const GB: i64 = 1024 * MB;
    const TB: i64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes.max(0))
    }
}
