//! Best-effort response cache shared by concurrent analyses.
//!
//! Backends never surface failures: a broken backend behaves like an empty
//! cache and `set`/`delete` report `false`.

pub mod memory;
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

pub const KEY_PREFIX: &str = "github:";

#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the live value stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> bool;

    async fn delete(&self, key: &str) -> bool;

    /// Releases backend connections. Safe to call more than once.
    async fn close(&self) {}

    fn name(&self) -> &str;
}

/// Normalizes an endpoint to a single leading slash.
pub fn normalize_endpoint(endpoint: &str) -> String {
    format!("/{}", endpoint.trim().trim_start_matches('/'))
}

/// Derives the cache key for an endpoint from a SHA-256 digest of its
/// normalized form.
pub fn cache_key(endpoint: &str) -> String {
    let digest = Sha256::digest(normalize_endpoint(endpoint).as_bytes());
    format!("{}{:x}", KEY_PREFIX, digest)
}
