//! Timestamped response store: opaque bodies keyed by request fingerprint.
//! No expiry logic here; freshness is decided by the caller.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use std::sync::Arc;

use unibell_core::error::{Result, UnibellError};

use crate::database::{Database, parse_timestamp};

/// A cached body together with the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

#[derive(Clone)]
pub struct ResponseStore {
    db: Arc<Database>,
}

impl ResponseStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Entry for `key`. Rows without a readable `created_at` count as absent.
    pub fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let conn = self.db.lock()?;
        let row: Option<(Vec<u8>, Option<String>)> = conn
            .query_row(
                "SELECT body, created_at FROM response_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| UnibellError::Storage(format!("Read response: {e}")))?;

        Ok(row.and_then(|(body, created_at)| {
            let created_at = created_at.as_deref().and_then(parse_timestamp)?;
            Some(CachedResponse { body, created_at })
        }))
    }

    /// Store or replace the entry for `key`.
    pub fn put(&self, key: &str, body: &[u8], created_at: DateTime<Utc>) -> Result<()> {
        self.db
            .lock()?
            .execute(
                "INSERT OR REPLACE INTO response_cache (key, body, created_at) VALUES (?1, ?2, ?3)",
                params![key, body, created_at.to_rfc3339()],
            )
            .map_err(|e| UnibellError::Storage(format!("Write response: {e}")))?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.db
            .lock()?
            .execute("DELETE FROM response_cache WHERE key = ?1", params![key])
            .map_err(|e| UnibellError::Storage(format!("Delete response: {e}")))?;
        Ok(())
    }
}
