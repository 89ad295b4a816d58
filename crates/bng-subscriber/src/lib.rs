//! Subscriber session engine for the BNG control plane.
//!
//! The engine consumes session lifecycle events, keeps the authoritative
//! session records in a shared cache, and drives the dataplane and lease
//! timers for the circuits this instance is Designated Forwarder for.
//!
//! # Architecture
//!
//! ```text
//! EventBus ──► LifecycleHandler ──► LifecycleProcessor ──► SessionStore ──► Cache
//!                                      │        │
//!                                   DfGate   Dataplane / ExpiryCoordinator
//!                                                              │
//! EventBus ◄──────────────── SessionExpiry ◄───────────────────┘
//! ```
//!
//! [`SubscriberManager`] composes these from injected collaborators and is
//! the only type most callers need.

pub mod df;
pub mod error;
pub mod expiry;
pub mod keys;
pub mod manager;
pub mod processor;
pub mod store;

pub use df::{DfDecision, DfGate};
pub use error::{Result, SubscriberError};
pub use expiry::SessionExpiry;
pub use manager::{SubscriberConfig, SubscriberManager};
pub use processor::{LifecycleHandler, LifecycleProcessor, ProcessOutcome, QosClasses};
pub use store::{SessionFilter, SessionStats, SessionStore, decode_record};
