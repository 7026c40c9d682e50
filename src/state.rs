//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::dedup::{DeduplicationService, SqliteRecordStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub db: SqlitePool,
    pub dedup: DeduplicationService,
}

impl AppState {
    /// Create a new application state over an initialized pool
    pub fn new(config: &Config, db: SqlitePool) -> Self {
        let store = Arc::new(SqliteRecordStore::new(db.clone()));
        let dedup = DeduplicationService::new(store, &config.dedup);

        Self {
            inner: Arc::new(AppStateInner { db, dedup }),
        }
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the deduplication service
    pub fn dedup(&self) -> &DeduplicationService {
        &self.inner.dedup
    }
}
