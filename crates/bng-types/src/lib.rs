//! Shared types for the BNG subscriber control plane.
//!
//! This crate holds the session model and lifecycle event that travel between
//! components, plus the collaborator traits the subscriber engine consumes:
//!
//! - [`Cache`]: scan-capable key/value store with per-key TTL
//! - [`EventBus`]: topic-based publish/subscribe with at-least-once delivery
//! - [`ExpiryCoordinator`]: per-session lease timers
//! - [`RedundancyManager`]: Designated Forwarder status per access circuit
//! - [`Dataplane`]: southbound policy programming
//!
//! The traits are object-safe so implementations can be injected as
//! `Arc<dyn Trait>` without the engine depending on them.

pub mod bus;
pub mod cache;
pub mod dataplane;
pub mod event;
pub mod expiry;
pub mod redundancy;
pub mod session;

pub use bus::{BusError, EventBus, EventHandler, HandlerError, SubscriptionId};
pub use cache::{Cache, CacheError, SCAN_DONE};
pub use dataplane::{Dataplane, DataplaneError};
pub use event::{EventType, LifecycleEvent};
pub use expiry::{ExpiryCoordinator, ExpiryHandler};
pub use redundancy::{GroupId, RedundancyManager};
pub use session::{
    AccessType, DecodeError, IpoeSession, PppSession, Protocol, SessionCore, SessionKind,
    SessionMetadata, SessionState, SubscriberSession,
};
