//! In-memory cache with TTL and stable cursor scans.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bng_types::{Cache, CacheError, SCAN_DONE};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::ttl::TtlTracker;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,

    /// Insertion sequence, stable across overwrites. Scan cursors walk
    /// keys in sequence order.
    seq: u64,
}

/// Inner state protected by RwLock.
struct CacheInner {
    entries: HashMap<String, CacheEntry>,

    /// Sequence → key, the order scans walk in.
    order: BTreeMap<u64, String>,

    /// Next sequence to hand out. Starts at 1 so cursor 0 means "begin".
    next_seq: u64,

    ttl: TtlTracker,
}

impl CacheInner {
    fn remove(&mut self, key: &str) -> bool {
        self.ttl.remove(key);
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    /// Drop `key` if its TTL has passed. Returns true if it was dropped.
    fn evict_if_expired(&mut self, key: &str) -> bool {
        if self.ttl.is_expired(key) {
            trace!(key = %key, "Key expired, removing from cache");
            self.remove(key);
            true
        } else {
            false
        }
    }
}

/// Single-node key/value cache.
///
/// Provides:
/// - Optional per-key TTL, replaced on every write
/// - Cursor scans over keys in insertion order: a key present for the whole
///   scan is returned exactly once, keys written or deleted mid-scan may or
///   may not be seen
/// - Thread-safe access via RwLock
pub struct MemoryCache {
    inner: Arc<RwLock<CacheInner>>,
    config: CacheConfig,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        let inner = CacheInner {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 1,
            ttl: TtlTracker::new(),
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of stored keys, including expired keys not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Whether a live (non-expired) key exists.
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner.entries.contains_key(key) && !inner.ttl.is_expired(key)
    }

    /// Remaining TTL of a live key; `None` if absent or stored without TTL.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let inner = self.inner.read().await;
        if !inner.entries.contains_key(key) || inner.ttl.is_expired(key) {
            return None;
        }
        inner.ttl.remaining(key)
    }

    /// Drop every expired key.
    ///
    /// This is called automatically by the cleanup task, but can also be
    /// called manually.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let expired = inner.ttl.drain_expired();
        let mut count = 0;

        for key in expired {
            if inner.remove(&key) {
                count += 1;
            }
        }

        if count > 0 {
            debug!(count = count, "Cleaned up expired keys");
        }

        count
    }

    /// Spawn the periodic sweep, if enabled, until `cancel` fires.
    pub fn spawn_cleanup_task(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.config.enable_cleanup_task {
            return None;
        }

        let cache = self.clone();
        let interval = self.config.cleanup_interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Cache cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.cleanup_expired().await;
                    }
                }
            }
        }))
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            keys: inner.entries.len(),
            ttl_tracked: inner.ttl.len(),
        }
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut inner = self.inner.write().await;
        if inner.evict_if_expired(key) {
            return Err(CacheError::NotFound(key.to_string()));
        }
        inner
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        inner.evict_if_expired(key);

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value = value;
        } else {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.order.insert(seq, key.to_string());
            inner
                .entries
                .insert(key.to_string(), CacheEntry { value, seq });
        }
        inner.ttl.set(key, ttl);

        trace!(key = %key, ttl = ?ttl, "Key written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        if inner.remove(key) {
            trace!(key = %key, "Key deleted");
        }
        Ok(())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(Vec<String>, u64), CacheError> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let inner = self.inner.read().await;
        let mut keys = Vec::new();
        let mut last_seq = None;

        for (seq, key) in inner.order.range(cursor.max(1)..).take(count.max(1)) {
            last_seq = Some(*seq);
            if !inner.ttl.is_expired(key) && matcher.matches(key) {
                keys.push(key.clone());
            }
        }

        let next = match last_seq {
            Some(seq) if inner.order.range(seq + 1..).next().is_some() => seq + 1,
            _ => SCAN_DONE,
        };

        Ok((keys, next))
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of stored keys.
    pub keys: usize,

    /// Number of keys carrying a TTL.
    pub ttl_tracked: usize,
}
