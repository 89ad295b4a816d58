//! Event bus interface.

use async_trait::async_trait;

use crate::event::LifecycleEvent;

/// Handle identifying a subscription, returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Errors from the event bus transport.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The event could not be handed to the transport.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
}

/// Failure reported by a handler back to the bus.
///
/// The bus decides what to do with it (log, redeliver); it is never
/// surfaced to the publisher.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Receives events for a subscribed topic.
///
/// Delivery is at-least-once, so implementations must be idempotent.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: LifecycleEvent) -> Result<(), HandlerError>;
}

/// Topic-based publish/subscribe transport.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Register `handler` for `topic`.
    fn subscribe(
        &self,
        topic: &str,
        handler: std::sync::Arc<dyn EventHandler>,
    ) -> SubscriptionId;

    /// Remove a subscription. Unknown subscriptions are ignored.
    fn unsubscribe(&self, topic: &str, id: SubscriptionId);

    /// Publish an event to every handler subscribed to `topic`.
    async fn publish(&self, topic: &str, event: LifecycleEvent) -> Result<(), BusError>;
}
