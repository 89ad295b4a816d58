//! Subscriber manager facade.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bng_config::{QosSection, SubscriberSection, defaults};
use bng_types::{
    AccessType, Cache, Dataplane, EventBus, ExpiryCoordinator, LifecycleEvent, RedundancyManager,
    SessionKind, SubscriberSession, SubscriptionId,
};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::df::{DfDecision, DfGate};
use crate::error::{Result, SubscriberError};
use crate::expiry::SessionExpiry;
use crate::processor::{LifecycleHandler, LifecycleProcessor, ProcessOutcome, QosClasses};
use crate::store::{SessionFilter, SessionStats, SessionStore};

/// Settings for the subscriber manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Lifecycle event topic.
    pub topic: String,
    /// Keys requested per cache scan round trip.
    pub scan_page_size: usize,
    pub qos_input_class: String,
    pub qos_output_class: String,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            topic: defaults::LIFECYCLE_TOPIC.to_string(),
            scan_page_size: defaults::SCAN_PAGE_SIZE,
            qos_input_class: defaults::QOS_INPUT_CLASS.to_string(),
            qos_output_class: defaults::QOS_OUTPUT_CLASS.to_string(),
        }
    }
}

impl SubscriberConfig {
    pub fn from_sections(subscriber: &SubscriberSection, qos: &QosSection) -> Self {
        Self {
            topic: subscriber.topic.clone(),
            scan_page_size: subscriber.scan_page_size,
            qos_input_class: qos.input_class.clone(),
            qos_output_class: qos.output_class.clone(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size;
        self
    }

    pub fn with_qos(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.qos_input_class = input.into();
        self.qos_output_class = output.into();
        self
    }
}

enum Lifecycle {
    Idle,
    Running(SubscriptionId),
    Stopped,
}

/// Entry point of the session engine.
///
/// Owns the processor and the expiry callback, wires them to the event bus
/// and the expiry coordinator on [`start`](Self::start), and answers the
/// upward query surface. `start` may be called once; `stop` tears the
/// wiring down and releases the bus and coordinator references to the
/// engine.
pub struct SubscriberManager {
    config: SubscriberConfig,
    store: SessionStore,
    df: DfGate,
    bus: Arc<dyn EventBus>,
    expiry: Arc<dyn ExpiryCoordinator>,
    processor: Arc<LifecycleProcessor>,
    lifecycle: Mutex<Lifecycle>,
}

impl SubscriberManager {
    pub fn new(
        config: SubscriberConfig,
        cache: Arc<dyn Cache>,
        bus: Arc<dyn EventBus>,
        expiry: Arc<dyn ExpiryCoordinator>,
        redundancy: Option<Arc<dyn RedundancyManager>>,
        dataplane: Arc<dyn Dataplane>,
    ) -> Self {
        let store = SessionStore::new(cache, config.scan_page_size);
        let df = DfGate::new(redundancy);
        let processor = Arc::new(LifecycleProcessor::new(
            store.clone(),
            df.clone(),
            Arc::clone(&expiry),
            dataplane,
            QosClasses {
                input: config.qos_input_class.clone(),
                output: config.qos_output_class.clone(),
            },
        ));

        Self {
            config,
            store,
            df,
            bus,
            expiry,
            processor,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
    }

    /// Subscribe to the lifecycle topic and start the expiry coordinator.
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return Err(SubscriberError::AlreadyStarted);
            }
            let handler = Arc::new(LifecycleHandler::new(Arc::clone(&self.processor)));
            let id = self.bus.subscribe(&self.config.topic, handler);
            *lifecycle = Lifecycle::Running(id);
        }

        let callback = Arc::new(SessionExpiry::new(
            self.store.clone(),
            Arc::clone(&self.bus),
            self.config.topic.clone(),
        ));
        self.expiry.start(callback).await;

        info!(
            topic = %self.config.topic,
            redundancy = self.df.is_configured(),
            "Subscriber manager started"
        );
        Ok(())
    }

    /// Unsubscribe and stop the expiry coordinator. Does nothing unless
    /// running.
    pub async fn stop(&self) {
        let subscription = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(id) => id,
                previous => {
                    *lifecycle = previous;
                    return;
                }
            }
        };

        self.bus.unsubscribe(&self.config.topic, subscription);
        self.expiry.stop().await;
        info!("Subscriber manager stopped");
    }

    /// Apply one event directly, bypassing the bus.
    pub async fn process(&self, event: &LifecycleEvent) -> Result<ProcessOutcome> {
        self.processor.process(event).await
    }

    /// Sessions matching `filter`. Eventually consistent.
    pub async fn get_sessions(&self, filter: &SessionFilter) -> Result<Vec<SubscriberSession>> {
        self.store.get_sessions(filter).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SubscriberSession> {
        self.store.get_session(session_id).await
    }

    /// Session counters. Eventually consistent.
    pub async fn get_stats(&self) -> Result<SessionStats> {
        self.store.get_stats().await
    }

    pub async fn find_by_circuit(
        &self,
        access_type: AccessType,
        mac: &str,
        outer_vlan: u16,
        inner_vlan: Option<u16>,
    ) -> Result<SubscriberSession> {
        self.store
            .find_by_circuit(access_type, mac, outer_vlan, inner_vlan)
            .await
    }

    pub async fn find_by_address(&self, if_index: u32, ipv4: Ipv4Addr) -> Result<SubscriberSession> {
        self.store.find_by_address(if_index, ipv4).await
    }

    /// DF status of a stored session's circuit.
    pub async fn df_status(&self, session_id: &str) -> Result<DfDecision> {
        let session = self.store.get_session(session_id).await?;
        Ok(self
            .df
            .decision(session.outer_vlan(), session.mac(), session.inner_vlan()))
    }

    /// Force a session down by publishing a `Released` event for it.
    ///
    /// The event's access type and protocol come from the session-ID prefix,
    /// not from the stored record; IDs outside the convention are published
    /// as IPoE/DHCPv4.
    pub async fn terminate_session(&self, session_id: &str) -> Result<LifecycleEvent> {
        let session = self.store.get_session(session_id).await?;

        let kind = SessionKind::from_session_id_prefix(session_id).unwrap_or_else(|| {
            warn!(
                session_id = %session_id,
                stored = %session.kind(),
                "Session ID has no kind prefix, terminating as IPoE/DHCPv4"
            );
            SessionKind::default()
        });

        let session = session.into_kind(kind).released();
        let event = LifecycleEvent::for_session(&session)?;
        self.bus.publish(&self.config.topic, event.clone()).await?;

        info!(session_id = %session_id, kind = %kind, "Session terminated by operator");
        Ok(event)
    }
}
