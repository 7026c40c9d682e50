//! Retention sweep
//!
//! Periodically lists file records older than the retention window and
//! flags them for review in the log. Records are never deleted or modified.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::config::CleanupConfig;
use crate::db::{FileRecord, FileRepository};
use crate::error::{AppError, Result};

/// Flags stale file records on a fixed interval
#[derive(Clone)]
pub struct CleanupSweep {
    pool: SqlitePool,
    retention_days: i64,
    interval: std::time::Duration,
}

impl CleanupSweep {
    pub fn new(pool: SqlitePool, config: &CleanupConfig) -> Self {
        Self {
            pool,
            retention_days: config.retention_days,
            interval: std::time::Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// Flag every record created before `now - retention`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let cutoff = Duration::try_days(self.retention_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "retention of {} days is out of range",
                    self.retention_days
                ))
            })?;
        let stale = FileRepository::new(&self.pool)
            .list_created_before(cutoff)
            .await?;

        if stale.is_empty() {
            tracing::info!(cutoff = %cutoff, "Cleanup: no files past retention");
            return Ok(stale);
        }

        tracing::info!(count = stale.len(), cutoff = %cutoff, "Cleanup: files past retention");
        for file in &stale {
            tracing::info!(
                file_id = %file.id,
                file_name = %file.file_name,
                created_at = %file.created_at,
                "Cleanup: flagging file for review"
            );
        }

        Ok(stale)
    }

    /// Start background sweep task
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);

            loop {
                interval.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    tracing::warn!(error = %e, "Cleanup sweep failed");
                }
            }
        })
    }
}
