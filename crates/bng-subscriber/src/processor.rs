//! Lifecycle event processing.

use std::sync::Arc;

use async_trait::async_trait;
use bng_types::{
    Dataplane, EventHandler, ExpiryCoordinator, HandlerError, LifecycleEvent, SessionState,
    SubscriberSession,
};
use chrono::{TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use crate::df::DfGate;
use crate::error::{Result, SubscriberError};
use crate::store::SessionStore;

/// What processing an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// DF, session active: dataplane programmed and lease armed.
    Activated,
    /// DF, session released: timer cancelled and records removed.
    Released,
    /// Not DF: state stored only.
    Replicated,
}

/// QoS classes applied to newly active sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosClasses {
    pub input: String,
    pub output: String,
}

/// Applies lifecycle events to the store, the dataplane and the expiry
/// coordinator.
///
/// Every instance persists every event so standby state stays warm. Only
/// the DF programs the dataplane and owns the expiry timer. Events carry
/// full snapshots, so reprocessing a redelivered event converges on the
/// same state.
pub struct LifecycleProcessor {
    store: SessionStore,
    df: DfGate,
    expiry: Arc<dyn ExpiryCoordinator>,
    dataplane: Arc<dyn Dataplane>,
    qos: QosClasses,
}

impl LifecycleProcessor {
    pub fn new(
        store: SessionStore,
        df: DfGate,
        expiry: Arc<dyn ExpiryCoordinator>,
        dataplane: Arc<dyn Dataplane>,
        qos: QosClasses,
    ) -> Self {
        Self {
            store,
            df,
            expiry,
            dataplane,
            qos,
        }
    }

    pub async fn process(&self, event: &LifecycleEvent) -> Result<ProcessOutcome> {
        let session = event.decode_session()?;
        let session_id = session.session_id();

        if session.outer_vlan() == 0 {
            return Err(SubscriberError::InvalidOuterVlan {
                session_id: session_id.to_string(),
            });
        }

        let df = self
            .df
            .decision(session.outer_vlan(), session.mac(), session.inner_vlan());

        // Read before persisting so the timer never lands after the record's TTL.
        let now = Utc::now();
        self.store.persist(&session).await?;

        if !df.is_df {
            debug!(
                session_id = %session_id,
                outer_vlan = session.outer_vlan(),
                group = ?df.group,
                state = %session.state(),
                "Not DF, session replicated"
            );
            return Ok(ProcessOutcome::Replicated);
        }

        match session.state() {
            SessionState::Active => {
                self.activate(&session).await;
                match session.lease_time() {
                    Some(lease) if lease > 0 => {
                        let at = now + TimeDelta::seconds(i64::from(lease));
                        self.expiry.set(session_id, at);
                    }
                    // No lease means no expiry, including one armed by an earlier snapshot.
                    _ => self.expiry.remove(session_id),
                }
                info!(
                    session_id = %session_id,
                    outer_vlan = session.outer_vlan(),
                    if_index = session.if_index(),
                    lease = ?session.lease_time(),
                    "Session active"
                );
                Ok(ProcessOutcome::Activated)
            }
            SessionState::Released => {
                self.expiry.remove(session_id);
                self.deactivate(&session);
                info!(session_id = %session_id, "Session released");
                Ok(ProcessOutcome::Released)
            }
        }
    }

    async fn activate(&self, session: &SubscriberSession) {
        let if_index = session.if_index();
        if if_index == 0 {
            debug!(session_id = %session.session_id(), "No interface bound, QoS skipped");
            return;
        }

        if let Err(e) = self
            .dataplane
            .apply_qos(if_index, &self.qos.input, &self.qos.output)
            .await
        {
            warn!(
                session_id = %session.session_id(),
                if_index,
                error = %e,
                "Failed to apply QoS"
            );
        }
    }

    // Dataplane teardown is not performed on release.
    fn deactivate(&self, session: &SubscriberSession) {
        debug!(
            session_id = %session.session_id(),
            if_index = session.if_index(),
            "Southbound release skipped"
        );
    }
}

/// Subscribes a [`LifecycleProcessor`] to the event bus.
pub struct LifecycleHandler {
    processor: Arc<LifecycleProcessor>,
}

impl LifecycleHandler {
    pub fn new(processor: Arc<LifecycleProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl EventHandler for LifecycleHandler {
    async fn handle(&self, event: LifecycleEvent) -> std::result::Result<(), HandlerError> {
        match self.processor.process(&event).await {
            Ok(outcome) => {
                debug!(event_id = %event.event_id, session_id = %event.session_id, ?outcome, "Event processed");
                Ok(())
            }
            Err(e) => {
                error!(
                    event_id = %event.event_id,
                    session_id = %event.session_id,
                    error = %e,
                    "Failed to process lifecycle event"
                );
                Err(HandlerError(e.to_string()))
            }
        }
    }
}
