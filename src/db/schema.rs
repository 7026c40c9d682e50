//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Accepted downloads. A content hash, once known, identifies exactly one row.
CREATE TABLE IF NOT EXISTS downloaded_files (
    id TEXT PRIMARY KEY,
    original_url TEXT CHECK (original_url IS NULL OR length(original_url) <= 2048),
    file_name TEXT NOT NULL,
    desktop_id TEXT,
    local_storage_path TEXT,
    etag TEXT,
    content_length INTEGER CHECK (content_length IS NULL OR content_length >= 0),
    file_hash TEXT UNIQUE,
    file_signature TEXT,
    user_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_etag_length ON downloaded_files(etag, content_length);
CREATE INDEX IF NOT EXISTS idx_files_original_url ON downloaded_files(original_url);
CREATE INDEX IF NOT EXISTS idx_files_file_name ON downloaded_files(file_name);
CREATE INDEX IF NOT EXISTS idx_files_user_created ON downloaded_files(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_files_created_at ON downloaded_files(created_at);

-- Audit trail of duplicate checks that matched an existing record
CREATE TABLE IF NOT EXISTS blocked_duplicates (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL DEFAULT 0,
    user_id TEXT NOT NULL,
    blocked_at TEXT NOT NULL,
    original_file_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blocked_original ON blocked_duplicates(original_file_id);
CREATE INDEX IF NOT EXISTS idx_blocked_at ON blocked_duplicates(blocked_at);
"#;
