//! Lease expiry handling.

use std::sync::Arc;

use async_trait::async_trait;
use bng_types::{EventBus, ExpiryHandler, LifecycleEvent, SessionMetadata, SubscriberSession};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::SessionStore;

/// Turns a fired lease timer into a `Released` lifecycle event.
///
/// The primary record is deleted here; the remaining teardown (index
/// records, timer, dataplane) happens when the republished event comes back
/// through the processor, on every instance that receives it.
pub struct SessionExpiry {
    store: SessionStore,
    bus: Arc<dyn EventBus>,
    topic: String,
}

impl SessionExpiry {
    pub fn new(store: SessionStore, bus: Arc<dyn EventBus>, topic: impl Into<String>) -> Self {
        Self {
            store,
            bus,
            topic: topic.into(),
        }
    }

    /// Expire one session.
    ///
    /// Returns the published event, or `None` if the session was already
    /// gone. The kind is recovered from stored metadata and falls back to
    /// IPoE/DHCPv4 when absent. A failed publish is logged, not returned.
    pub async fn expire(&self, session_id: &str) -> Result<Option<LifecycleEvent>> {
        let Some(bytes) = self.store.load_raw(session_id).await? else {
            debug!(session_id = %session_id, "Expired session already removed");
            return Ok(None);
        };

        let kind = SessionMetadata::from_slice(&bytes)
            .ok()
            .and_then(|meta| meta.kind())
            .unwrap_or_default();

        self.store.delete_primary(session_id).await?;

        let session = SubscriberSession::from_slice(kind, &bytes)?.released();
        let event = LifecycleEvent::for_session(&session)?;

        if let Err(e) = self.bus.publish(&self.topic, event.clone()).await {
            warn!(session_id = %session_id, error = %e, "Failed to publish expiry event");
        }
        Ok(Some(event))
    }
}

#[async_trait]
impl ExpiryHandler for SessionExpiry {
    async fn on_expired(&self, session_id: &str, fired_at: DateTime<Utc>) {
        match self.expire(session_id).await {
            Ok(Some(event)) => info!(
                session_id = %session_id,
                access_type = %event.access_type,
                protocol = %event.protocol,
                fired_at = %fired_at,
                "Session lease expired"
            ),
            Ok(None) => {}
            Err(e) => warn!(session_id = %session_id, error = %e, "Session expiry failed"),
        }
    }
}
