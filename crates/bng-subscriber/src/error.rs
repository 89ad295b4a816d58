//! Subscriber engine error types.

use bng_types::{BusError, CacheError, DecodeError};
use thiserror::Error;

/// Errors returned by the session engine.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// The event or stored record could not be decoded.
    #[error("Invalid session payload: {0}")]
    Decode(#[from] DecodeError),

    /// The session has no outer VLAN.
    #[error("Session {session_id} rejected: outer VLAN must be nonzero")]
    InvalidOuterVlan { session_id: String },

    /// No primary record (or index entry) exists.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Cache read/write on the primary record failed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// An index record could not be written after the primary was.
    #[error("Index write failed for {key}: {source}")]
    IndexWrite {
        key: String,
        #[source]
        source: CacheError,
    },

    /// A session snapshot could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Publishing a lifecycle event failed.
    #[error("Publish error: {0}")]
    Publish(#[from] BusError),

    #[error("Subscriber manager already started")]
    AlreadyStarted,
}

/// Result type for subscriber engine operations.
pub type Result<T> = std::result::Result<T, SubscriberError>;
