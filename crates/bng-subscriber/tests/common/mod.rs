//! Common test doubles for subscriber engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bng_cache::{CacheConfig, MemoryCache};
use bng_runtime::LocalEventBus;
use bng_subscriber::{SubscriberConfig, SubscriberManager};
use bng_types::{
    Cache, CacheError, Dataplane, DataplaneError, EventBus, EventHandler, ExpiryCoordinator,
    ExpiryHandler, GroupId, HandlerError, IpoeSession, LifecycleEvent, PppSession,
    RedundancyManager, SessionCore, SessionKind, SessionState, SubscriberSession,
};
use chrono::{DateTime, Utc};

pub const TOPIC: &str = "test.lifecycle";

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

pub fn ipoe_v4(id: &str, outer_vlan: u16, lease_time: u32) -> SubscriberSession {
    IpoeSession::new(
        SessionCore::new(id, SessionKind::IpoeV4, "aa:bb:cc:dd:ee:ff", outer_vlan),
        lease_time,
    )
    .into()
}

/// IPoE/DHCPv4 session with every optional field set.
pub fn ipoe_v4_full(id: &str, mac: &str, if_index: u32, ipv4: Ipv4Addr) -> SubscriberSession {
    IpoeSession::new(
        SessionCore::new(id, SessionKind::IpoeV4, mac, 100)
            .with_inner_vlan(20)
            .with_if_index(if_index)
            .with_ipv4(ipv4)
            .with_hostname("cpe-1"),
        3600,
    )
    .into()
}

pub fn ipoe_v6(id: &str, outer_vlan: u16) -> SubscriberSession {
    IpoeSession::new(
        SessionCore::new(id, SessionKind::IpoeV6, "aa:bb:cc:dd:ee:01", outer_vlan)
            .with_ipv6("2001:db8::10".parse().unwrap()),
        1800,
    )
    .into()
}

pub fn ppp(id: &str, outer_vlan: u16) -> SubscriberSession {
    PppSession::new(
        SessionCore::new(id, SessionKind::Ppp, "00:11:22:33:44:55", outer_vlan)
            .with_if_index(9)
            .with_ipv4(Ipv4Addr::new(100, 64, 0, 9)),
    )
    .into()
}

pub fn event(session: &SubscriberSession) -> LifecycleEvent {
    LifecycleEvent::for_session(session).unwrap()
}

pub fn released(session: &SubscriberSession) -> SubscriberSession {
    let mut session = session.clone();
    session.core_mut().state = SessionState::Released;
    session
}

// ─────────────────────────────────────────────────────────────────────────────
// Dataplane
// ─────────────────────────────────────────────────────────────────────────────

/// Dataplane that records every QoS request.
#[derive(Default)]
pub struct RecordingDataplane {
    calls: Mutex<Vec<(u32, String, String)>>,
    fail: bool,
}

impl RecordingDataplane {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(u32, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Dataplane for RecordingDataplane {
    async fn apply_qos(
        &self,
        if_index: u32,
        input_class: &str,
        output_class: &str,
    ) -> Result<(), DataplaneError> {
        self.calls.lock().unwrap().push((
            if_index,
            input_class.to_string(),
            output_class.to_string(),
        ));
        if self.fail {
            return Err(DataplaneError::Rejected("programming failed".to_string()));
        }
        Ok(())
    }

    async fn interface_index(&self, name: &str) -> Result<u32, DataplaneError> {
        Err(DataplaneError::InterfaceNotFound(name.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Redundancy
// ─────────────────────────────────────────────────────────────────────────────

/// Redundancy collaborator with a fixed answer.
pub struct FixedRedundancy {
    pub df: bool,
    pub group: Option<GroupId>,
}

#[async_trait]
impl RedundancyManager for FixedRedundancy {
    async fn start(&self) {}
    async fn stop(&self) {}

    fn is_df(&self, _outer_vlan: u16, _mac: &str, _inner_vlan: u16) -> bool {
        self.df
    }

    fn group_for_svlan(&self, _outer_vlan: u16) -> Option<GroupId> {
        self.group
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expiry
// ─────────────────────────────────────────────────────────────────────────────

/// Expiry coordinator whose timers only fire when a test calls [`fire`].
///
/// [`fire`]: ManualExpiry::fire
#[derive(Default)]
pub struct ManualExpiry {
    armed: Mutex<HashMap<String, DateTime<Utc>>>,
    removed: Mutex<Vec<String>>,
    handler: Mutex<Option<Arc<dyn ExpiryHandler>>>,
    set_count: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl ManualExpiry {
    pub fn armed(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.armed.lock().unwrap().get(session_id).copied()
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }

    pub fn set_count(&self) -> usize {
        self.set_count.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    /// Fire the timer for `session_id` now, whether armed or not.
    pub async fn fire(&self, session_id: &str) {
        self.armed.lock().unwrap().remove(session_id);
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler.on_expired(session_id, Utc::now()).await;
        }
    }
}

#[async_trait]
impl ExpiryCoordinator for ManualExpiry {
    async fn start(&self, handler: Arc<dyn ExpiryHandler>) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.handler.lock().unwrap().take();
    }

    fn set(&self, session_id: &str, at: DateTime<Utc>) {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        self.armed.lock().unwrap().insert(session_id.to_string(), at);
    }

    fn remove(&self, session_id: &str) {
        self.armed.lock().unwrap().remove(session_id);
        self.removed.lock().unwrap().push(session_id.to_string());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Handler that keeps every event it receives.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    async fn handle(&self, event: LifecycleEvent) -> Result<(), HandlerError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Bus that rejects every publish.
pub struct BrokenBus;

#[async_trait]
impl EventBus for BrokenBus {
    fn subscribe(&self, _topic: &str, _handler: Arc<dyn EventHandler>) -> bng_types::SubscriptionId {
        bng_types::SubscriptionId(1)
    }

    fn unsubscribe(&self, _topic: &str, _id: bng_types::SubscriptionId) {}

    async fn publish(&self, topic: &str, _event: LifecycleEvent) -> Result<(), bng_types::BusError> {
        Err(bng_types::BusError::Publish {
            topic: topic.to_string(),
            reason: "transport down".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

pub fn memory_cache() -> MemoryCache {
    MemoryCache::new(CacheConfig::default())
}

/// Cache wrapper that fails writes or deletes for chosen key prefixes and
/// records every delete attempt.
#[derive(Clone)]
pub struct FlakyCache {
    pub inner: MemoryCache,
    fail_set: Arc<Mutex<Vec<String>>>,
    fail_delete: Arc<Mutex<Vec<String>>>,
    deletes: Arc<Mutex<Vec<String>>>,
}

impl FlakyCache {
    pub fn new(inner: MemoryCache) -> Self {
        Self {
            inner,
            fail_set: Arc::default(),
            fail_delete: Arc::default(),
            deletes: Arc::default(),
        }
    }

    pub fn fail_set_on(&self, prefix: &str) {
        self.fail_set.lock().unwrap().push(prefix.to_string());
    }

    pub fn fail_delete_on(&self, prefix: &str) {
        self.fail_delete.lock().unwrap().push(prefix.to_string());
    }

    pub fn delete_attempts(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    fn matches(list: &Mutex<Vec<String>>, key: &str) -> bool {
        list.lock().unwrap().iter().any(|p| key.starts_with(p.as_str()))
    }
}

#[async_trait]
impl Cache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        if Self::matches(&self.fail_set, key) {
            return Err(CacheError::Unavailable(format!("set {key}")));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.lock().unwrap().push(key.to_string());
        if Self::matches(&self.fail_delete, key) {
            return Err(CacheError::Unavailable(format!("delete {key}")));
        }
        self.inner.delete(key).await
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(Vec<String>, u64), CacheError> {
        self.inner.scan(cursor, pattern, count).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

/// A manager wired to in-memory collaborators, plus handles to inspect them.
pub struct Harness {
    pub cache: MemoryCache,
    pub bus: Arc<LocalEventBus>,
    pub expiry: Arc<ManualExpiry>,
    pub dataplane: Arc<RecordingDataplane>,
    pub manager: SubscriberManager,
    pub published: Arc<EventRecorder>,
}

impl Harness {
    /// Single-node harness (no redundancy collaborator).
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_df(df: bool) -> Self {
        Self::build(Some(Arc::new(FixedRedundancy { df, group: Some(1) })))
    }

    fn build(redundancy: Option<Arc<dyn RedundancyManager>>) -> Self {
        let cache = memory_cache();
        let bus = Arc::new(LocalEventBus::new());
        let expiry = Arc::new(ManualExpiry::default());
        let dataplane = Arc::new(RecordingDataplane::default());
        let published = Arc::new(EventRecorder::default());
        bus.subscribe(TOPIC, published.clone());

        let manager = SubscriberManager::new(
            SubscriberConfig::default()
                .with_topic(TOPIC)
                .with_scan_page_size(2)
                .with_qos("in-class", "out-class"),
            Arc::new(cache.clone()),
            bus.clone(),
            expiry.clone(),
            redundancy,
            dataplane.clone(),
        );

        Self {
            cache,
            bus,
            expiry,
            dataplane,
            manager,
            published,
        }
    }

    pub async fn started() -> Self {
        let harness = Self::new();
        harness.manager.start().await.unwrap();
        harness
    }
}
