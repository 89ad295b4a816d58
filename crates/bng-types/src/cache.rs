//! Key/value cache interface.

use std::time::Duration;

use async_trait::async_trait;

/// Cursor value that starts a scan and that signals its completion.
pub const SCAN_DONE: u64 = 0;

/// Errors returned by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key does not exist (or has expired).
    #[error("key not found: {0}")]
    NotFound(String),

    /// The scan pattern could not be compiled.
    #[error("invalid scan pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The cache could not be reached or refused the operation.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Scan-capable key/value cache with per-key TTL.
///
/// Only single-key operations are atomic. Scans are not snapshots: keys
/// written or deleted while a scan is in progress may or may not be
/// returned, but keys present for the whole scan are returned at least once.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a value. Returns [`CacheError::NotFound`] if the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Write a value, replacing any previous value and TTL.
    ///
    /// `ttl` of `None` stores the key without expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Return up to roughly `count` keys matching the glob `pattern`,
    /// starting at `cursor`, together with the cursor for the next page.
    ///
    /// A returned cursor of [`SCAN_DONE`] means the scan is complete.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(Vec<String>, u64), CacheError>;
}
