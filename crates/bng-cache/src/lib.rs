//! In-memory key/value cache with TTL and cursor scans.
//!
//! This crate provides the single-node implementation of the
//! [`bng_types::Cache`] interface:
//! - Per-key TTL, enforced lazily on access and by an optional sweep task
//! - Glob-filtered, cursor-paginated scans that stay stable while keys are
//!   written and deleted
//!
//! # Example
//!
//! ```rust,ignore
//! use bng_cache::{CacheConfig, MemoryCache};
//!
//! let cache = MemoryCache::new(CacheConfig::default());
//! cache.set("sessions:a", b"{}".to_vec(), Some(Duration::from_secs(60))).await?;
//! ```

mod cache;
mod config;
mod ttl;

pub use cache::{CacheStats, MemoryCache};
pub use config::CacheConfig;
pub use ttl::TtlTracker;
