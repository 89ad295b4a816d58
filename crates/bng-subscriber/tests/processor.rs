//! Lifecycle processing through the manager's direct entry point.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use bng_runtime::LocalEventBus;
use bng_subscriber::{ProcessOutcome, SubscriberConfig, SubscriberError, SubscriberManager};
use bng_types::{AccessType, DecodeError, Protocol};
use chrono::{TimeDelta, Utc};
use common::*;

#[tokio::test]
async fn test_zero_outer_vlan_is_rejected_without_mutation() {
    let h = Harness::new();
    let session = ipoe_v4("ipoe-v4-001", 0, 3600);

    let err = h.manager.process(&event(&session)).await.unwrap_err();

    assert!(matches!(err, SubscriberError::InvalidOuterVlan { .. }));
    assert!(h.cache.is_empty().await);
    assert_eq!(h.dataplane.call_count(), 0);
    assert_eq!(h.expiry.set_count(), 0);
}

#[tokio::test]
async fn test_payload_kind_must_match_declared_kind() {
    let h = Harness::new();
    let mut ev = event(&ipoe_v4("ipoe-v4-001", 100, 60));
    ev.access_type = AccessType::Pppoe;
    ev.protocol = Protocol::Ppp;

    let err = h.manager.process(&ev).await.unwrap_err();

    assert!(matches!(err, SubscriberError::Decode(_)));
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn test_invalid_declared_pair_is_rejected() {
    let h = Harness::new();
    let mut ev = event(&ipoe_v4("ipoe-v4-001", 100, 60));
    ev.protocol = Protocol::Ppp;

    let err = h.manager.process(&ev).await.unwrap_err();

    assert!(matches!(
        err,
        SubscriberError::Decode(DecodeError::UnsupportedKind { .. })
    ));
}

#[tokio::test]
async fn test_payload_for_other_session_is_rejected() {
    let h = Harness::new();
    let mut ev = event(&ipoe_v4("ipoe-v4-001", 100, 60));
    ev.session_id = "ipoe-v4-002".to_string();

    let err = h.manager.process(&ev).await.unwrap_err();

    assert!(matches!(
        err,
        SubscriberError::Decode(DecodeError::SessionIdMismatch { .. })
    ));
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn test_df_active_programs_qos_and_arms_lease() {
    let h = Harness::new();
    let session = ipoe_v4_full("ipoe-v4-001", "aa:bb:cc:dd:ee:ff", 12, Ipv4Addr::new(10, 0, 0, 5));
    let before = Utc::now();

    let outcome = h.manager.process(&event(&session)).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Activated);
    assert_eq!(
        h.dataplane.calls(),
        vec![(12, "in-class".to_string(), "out-class".to_string())]
    );
    let at = h.expiry.armed("ipoe-v4-001").unwrap();
    assert!(at >= before + TimeDelta::seconds(3600));
    assert!(at <= Utc::now() + TimeDelta::seconds(3600));
    assert!(h.cache.contains("sessions:ipoe-v4-001").await);
}

#[tokio::test]
async fn test_zero_lease_arms_no_timer() {
    let h = Harness::new();

    h.manager
        .process(&event(&ipoe_v4("ipoe-v4-001", 100, 0)))
        .await
        .unwrap();

    assert_eq!(h.expiry.set_count(), 0);
    assert_eq!(h.cache.ttl("sessions:ipoe-v4-001").await, None);
}

#[tokio::test]
async fn test_zero_lease_renewal_cancels_earlier_timer() {
    let h = Harness::new();

    h.manager
        .process(&event(&ipoe_v4("ipoe-v4-001", 100, 60)))
        .await
        .unwrap();
    assert!(h.expiry.armed("ipoe-v4-001").is_some());

    h.manager
        .process(&event(&ipoe_v4("ipoe-v4-001", 100, 0)))
        .await
        .unwrap();

    assert_eq!(h.expiry.armed("ipoe-v4-001"), None);
    assert_eq!(h.expiry.removed(), vec!["ipoe-v4-001"]);
    assert_eq!(h.cache.ttl("sessions:ipoe-v4-001").await, None);
}

#[tokio::test]
async fn test_ppp_snapshot_over_leased_id_cancels_timer() {
    let h = Harness::new();
    let leased = ipoe_v4("ppp-001", 300, 60);
    h.manager.process(&event(&leased)).await.unwrap();
    assert!(h.expiry.armed("ppp-001").is_some());

    h.manager
        .process(&event(&ppp("ppp-001", 300)))
        .await
        .unwrap();

    assert_eq!(h.expiry.armed("ppp-001"), None);
}

#[tokio::test]
async fn test_unbound_interface_skips_qos() {
    let h = Harness::new();

    let outcome = h
        .manager
        .process(&event(&ipoe_v4("ipoe-v4-001", 100, 60)))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Activated);
    assert_eq!(h.dataplane.call_count(), 0);
    assert_eq!(h.expiry.set_count(), 1);
}

#[tokio::test]
async fn test_ppp_session_arms_no_timer() {
    let h = Harness::new();

    h.manager
        .process(&event(&ppp("ppp-001", 300)))
        .await
        .unwrap();

    assert_eq!(h.dataplane.call_count(), 1);
    assert_eq!(h.expiry.set_count(), 0);
}

#[tokio::test]
async fn test_not_df_persists_only() {
    let h = Harness::with_df(false);
    let session = ipoe_v4_full("ipoe-v4-001", "aa:bb:cc:dd:ee:ff", 12, Ipv4Addr::new(10, 0, 0, 5));

    let outcome = h.manager.process(&event(&session)).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Replicated);
    assert!(h.cache.contains("sessions:ipoe-v4-001").await);
    assert!(h.cache.contains("lookup:arp:12:10.0.0.5").await);
    assert_eq!(h.dataplane.call_count(), 0);
    assert_eq!(h.expiry.set_count(), 0);
}

#[tokio::test]
async fn test_not_df_release_removes_records_but_not_timer() {
    let h = Harness::with_df(false);
    let session = ipoe_v4("ipoe-v4-001", 100, 60);
    h.manager.process(&event(&session)).await.unwrap();

    let outcome = h
        .manager
        .process(&event(&released(&session)))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Replicated);
    assert!(h.cache.is_empty().await);
    assert!(h.expiry.removed().is_empty());
}

#[tokio::test]
async fn test_df_release_cancels_timer_and_removes_records() {
    let h = Harness::new();
    let session = ipoe_v4_full("ipoe-v4-001", "aa:bb:cc:dd:ee:ff", 12, Ipv4Addr::new(10, 0, 0, 5));
    h.manager.process(&event(&session)).await.unwrap();
    assert_eq!(h.cache.len().await, 3);

    let outcome = h
        .manager
        .process(&event(&released(&session)))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Released);
    assert_eq!(h.expiry.removed(), vec!["ipoe-v4-001"]);
    assert_eq!(h.expiry.armed_count(), 0);
    assert!(h.cache.is_empty().await);
    // Activation only; release does not touch the dataplane.
    assert_eq!(h.dataplane.call_count(), 1);
}

#[tokio::test]
async fn test_dataplane_failure_does_not_fail_processing() {
    let cache = memory_cache();
    let expiry = Arc::new(ManualExpiry::default());
    let manager = SubscriberManager::new(
        SubscriberConfig::default(),
        Arc::new(cache.clone()),
        Arc::new(LocalEventBus::new()),
        expiry.clone(),
        None,
        Arc::new(RecordingDataplane::failing()),
    );
    let session = ipoe_v4_full("ipoe-v4-001", "aa:bb:cc:dd:ee:ff", 12, Ipv4Addr::new(10, 0, 0, 5));

    let outcome = manager.process(&event(&session)).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Activated);
    assert!(cache.contains("sessions:ipoe-v4-001").await);
    assert_eq!(expiry.set_count(), 1);
}

#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let h = Harness::new();
    let session = ipoe_v4_full("ipoe-v4-001", "aa:bb:cc:dd:ee:ff", 12, Ipv4Addr::new(10, 0, 0, 5));
    let ev = event(&session);

    h.manager.process(&ev).await.unwrap();
    h.manager.process(&ev).await.unwrap();

    assert_eq!(h.cache.len().await, 3);
    assert_eq!(h.expiry.armed_count(), 1);
    assert_eq!(h.manager.get_session("ipoe-v4-001").await.unwrap(), session);
}

#[tokio::test]
async fn test_released_event_for_unknown_session_succeeds() {
    let h = Harness::new();

    let outcome = h
        .manager
        .process(&event(&released(&ipoe_v4("ipoe-v4-404", 100, 60))))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Released);
    assert!(h.cache.is_empty().await);
}
