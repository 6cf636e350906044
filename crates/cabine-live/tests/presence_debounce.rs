//! Aggregate presence and debounced broadcast tests.
//!
//! The visitor count must stay correct under churn while the lock-gated
//! debounce keeps the emission rate at one per window:
//!
//! 1. **Immediate feedback**: Joiners get a targeted count right away
//! 2. **Collapse**: A join-leave burst produces a single room broadcast
//! 3. **Resilience**: A broken lock store degrades to silence, not errors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use cabine_core::{ConnectionId, RoomName};
use cabine_live::presence::SITE_ROOM;
use cabine_live::protocol::SITE_VISITORS;
use cabine_test_utils::{
    assert_no_event, event_json, expect_single_event, init_test_logging, TestHarness,
};

fn conn(id: &str) -> ConnectionId {
    ConnectionId::new(id).expect("connection id")
}

#[tokio::test]
async fn joiner_receives_immediate_count() {
    let harness = TestHarness::new();

    let conn_1 = conn("conn-1");
    harness.presence.came_online(&conn_1).await.expect("online");
    let targeted = harness.transport.events_to_connection(&conn_1);
    let visitors = expect_single_event(&targeted, SITE_VISITORS);
    assert_eq!(event_json(&visitors)["count"], 1);

    let conn_2 = conn("conn-2");
    harness.presence.came_online(&conn_2).await.expect("online");
    let targeted = harness.transport.events_to_connection(&conn_2);
    let visitors = expect_single_event(&targeted, SITE_VISITORS);
    assert_eq!(event_json(&visitors)["count"], 2);
}

#[tokio::test]
async fn churn_collapses_to_one_broadcast() {
    init_test_logging();
    let harness = TestHarness::new();
    let site = RoomName::new(SITE_ROOM);

    harness
        .presence
        .came_online(&conn("conn-1"))
        .await
        .expect("online 1");
    harness
        .presence
        .came_online(&conn("conn-2"))
        .await
        .expect("online 2");
    // Let the join-triggered broadcasts drain before the burst under test
    tokio::time::sleep(Duration::from_millis(60)).await;
    harness.transport.clear_events();

    let conn_3 = conn("conn-3");
    harness.presence.came_online(&conn_3).await.expect("online 3");
    harness
        .presence
        .went_offline(&conn_3)
        .await
        .expect("offline 3");
    tokio::time::sleep(Duration::from_millis(60)).await;

    // One emission for the whole burst, carrying the settled count
    let broadcasts = harness.transport.events_to_room(&site);
    let visitors = expect_single_event(&broadcasts, SITE_VISITORS);
    assert_eq!(event_json(&visitors)["count"], 2);
}

#[tokio::test]
async fn offline_broadcast_failure_is_logged_not_raised() {
    let harness = TestHarness::new();
    let conn_1 = conn("conn-1");
    harness.presence.came_online(&conn_1).await.expect("online");
    tokio::time::sleep(Duration::from_millis(60)).await;
    harness.transport.clear_events();

    harness.kv.inject_failure("lock/");
    harness
        .presence
        .went_offline(&conn_1)
        .await
        .expect("offline despite broken lock store");

    assert!(!harness.transport.is_member(&conn_1, &RoomName::new(SITE_ROOM)));
    assert_no_event(&harness.transport.events(), SITE_VISITORS);
}

#[tokio::test]
async fn coordinator_lifecycle_tracks_presence() {
    let harness = TestHarness::new();
    let conn_1 = conn("conn-1");
    let site = RoomName::new(SITE_ROOM);

    harness.coordinator.connection_opened(&conn_1).await;
    assert!(harness.transport.is_member(&conn_1, &site));

    harness.coordinator.connection_closed(&conn_1).await;
    assert!(!harness.transport.is_member(&conn_1, &site));
}
