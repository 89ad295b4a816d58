//! In-process event bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bng_types::{BusError, EventBus, EventHandler, LifecycleEvent, SubscriptionId};
use parking_lot::RwLock;
use tracing::{debug, warn};

struct Subscriber {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// Delivers each published event to every handler on the topic, in
/// subscription order, before `publish` returns.
///
/// Handler failures are logged and do not reach the publisher. Handlers are
/// invoked outside the subscription lock, so a handler may publish or
/// (un)subscribe without deadlocking.
#[derive(Default)]
pub struct LocalEventBus {
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handlers subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, handler });
        debug!(topic = %topic, subscription = %id, "Handler subscribed");
        id
    }

    fn unsubscribe(&self, topic: &str, id: SubscriptionId) {
        let mut topics = self.topics.write();
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                topics.remove(topic);
            }
            debug!(topic = %topic, subscription = %id, "Handler unsubscribed");
        }
    }

    async fn publish(&self, topic: &str, event: LifecycleEvent) -> Result<(), BusError> {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .topics
            .read()
            .get(topic)
            .map(|subs| subs.iter().map(|s| Arc::clone(&s.handler)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(topic = %topic, session_id = %event.session_id, "No subscribers for event");
            return Ok(());
        }

        for handler in handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                warn!(
                    topic = %topic,
                    event_id = %event.event_id,
                    session_id = %event.session_id,
                    error = %e,
                    "Event handler failed"
                );
            }
        }

        Ok(())
    }
}
