use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::cache::Cache;
use crate::error::{Error, Result};

/// Cache persisted in a SQLite database so entries survive restarts and can
/// be shared by several processes pointing at the same file.
///
/// Values are stored as JSON text next to an absolute expiry in unix seconds.
pub struct SqliteCache {
    conn: Mutex<Option<Connection>>,
}

impl SqliteCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at);
            "#,
        )
        .map_err(storage_error)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Removes every expired row, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.with_conn("purge", |conn| {
            conn.execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
        })
        .unwrap_or(0)
    }

    fn with_conn<T>(
        &self,
        op: &str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Option<T> {
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("Cache {} failed: {}", op, e);
                return None;
            }
        };

        let Some(conn) = guard.as_ref() else {
            tracing::debug!("Cache {} skipped: connection closed", op);
            return None;
        };

        match f(conn) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cache {} failed: {}", op, e);
                None
            }
        }
    }
}

fn storage_error(e: rusqlite::Error) -> Error {
    Error::Config(format!("Failed to open cache database: {}", e))
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let row: Option<(String, i64)> = self
            .with_conn("get", |conn| {
                conn.query_row(
                    "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
            })
            .flatten();

        let (text, expires_at) = row?;

        if expires_at <= Utc::now().timestamp() {
            self.with_conn("evict", |conn| {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            });
            return None;
        }

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> bool {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Cache set failed for key {}: {}", key, e);
                return false;
            }
        };
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);

        self.with_conn("set", |conn| {
            conn.execute(
                r#"
                INSERT INTO cache_entries (key, value, expires_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    expires_at = excluded.expires_at
                "#,
                params![key, text, expires_at],
            )
        })
        .is_some()
    }

    async fn delete(&self, key: &str) -> bool {
        self.with_conn("delete", |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
        })
        .is_some()
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.conn.lock() {
            if let Some(conn) = guard.take() {
                if let Err((_, e)) = conn.close() {
                    tracing::warn!("Failed to close cache database: {}", e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
