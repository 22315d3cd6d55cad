//! Shared SQLite connection with schema migrations.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use unibell_core::error::{Result, UnibellError};

/// Single connection shared by every store. SQLite serializes writers on it.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the cache database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| UnibellError::Storage(format!("DB open: {e}")))?;

        // WAL keeps readers unblocked while an upsert transaction commits
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        tracing::debug!("🗄️ Cache database ready at {}", path.display());
        Ok(db)
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| UnibellError::Storage(format!("DB open: {e}")))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            -- Raw responses of generic endpoints, keyed by request fingerprint
            CREATE TABLE IF NOT EXISTS response_cache (
                key TEXT PRIMARY KEY,
                body BLOB NOT NULL,
                created_at TEXT                 -- NULL means the entry is incomplete
            );

            -- One row per (group, calendar day), including days without lessons
            CREATE TABLE IF NOT EXISTS schedule_days (
                group_id INTEGER NOT NULL,
                date TEXT NOT NULL,             -- ISO YYYY-MM-DD
                lessons TEXT NOT NULL,          -- JSON array of lessons
                updated_at TEXT NOT NULL,
                PRIMARY KEY (group_id, date)
            );

            -- Notification subscribers
            CREATE TABLE IF NOT EXISTS chats (
                chat_id INTEGER PRIMARY KEY,
                group_id INTEGER NOT NULL,
                language_code TEXT NOT NULL DEFAULT 'en',
                notify_offset TEXT NOT NULL DEFAULT '15m',
                notifications_enabled INTEGER NOT NULL DEFAULT 1,
                inaccessible INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
         ",
            )
            .map_err(|e| UnibellError::Storage(format!("Migration: {e}")))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| UnibellError::Storage(format!("Lock: {e}")))
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_migrate() {
        let dir = std::env::temp_dir().join("unibell-db-test");
        let path = dir.join("cache.db");
        std::fs::remove_file(&path).ok();
        let db = Database::open(&path).unwrap();
        let tables: i64 = db
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('response_cache', 'schedule_days', 'chats')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
        drop(db);
        // Reopening an existing file must not fail on the migration
        assert!(Database::open(&path).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2026-02-22T08:30:00+00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
