//! Audio relay gating and archival tests.
//!
//! The relay is the latency-critical path: chunks from the active
//! interpreter reach listeners immediately, chunks from anyone else vanish
//! without error, and archival never sits between the two.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use bytes::Bytes;
use cabine_core::{BoothId, Channel, EventPayload, SessionId};
use cabine_live::protocol::CHANNEL_DATA;
use cabine_test_utils::{expect_single_event, TestHarness};

fn booth(session: &str, channel: Channel) -> BoothId {
    BoothId::new(SessionId::new(session).expect("session id"), channel)
}

#[tokio::test]
async fn inactive_sender_is_dropped_silently() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;

    // Authenticated but never started: the chunk is expected traffic after
    // a takeover, so it is dropped rather than rejected
    harness
        .audio
        .relay(&conn, Bytes::from_static(b"pcm"))
        .await
        .expect("relay");

    assert!(harness.transport.events_named(CHANNEL_DATA).is_empty());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(harness.archive.uploads().is_empty());
}

#[tokio::test]
async fn active_sender_reaches_channel_listeners() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::En);
    harness.booths.start(&conn, &target).await.expect("start");

    harness.seed_attendee("tok-l", "user-l", "lee@example.com");
    let listener = harness.connect("conn-l", "tok-l").await;
    harness
        .channels
        .join(&listener, &target)
        .await
        .expect("listen");
    harness.transport.clear_events();

    let chunk = Bytes::from_static(b"opus frame");
    harness.audio.relay(&conn, chunk.clone()).await.expect("relay");

    let data = expect_single_event(
        &harness.transport.events_to_room(&target.channel_room()),
        CHANNEL_DATA,
    );
    assert_eq!(data.payload, EventPayload::Binary(chunk.clone()));

    // Archival happens off the relay path, keyed by booth and timestamp
    tokio::time::sleep(Duration::from_millis(10)).await;
    let uploads = harness.archive.uploads();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.starts_with("interpretation/sess-1/en/"));
    assert!(uploads[0].0.ends_with(".chunk"));
    assert_eq!(uploads[0].1, chunk);
}

#[tokio::test]
async fn archive_failure_does_not_affect_broadcast() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::Fr);
    harness.booths.start(&conn, &target).await.expect("start");
    harness.transport.clear_events();

    harness.archive.inject_failure("interpretation/");
    harness
        .audio
        .relay(&conn, Bytes::from_static(b"pcm"))
        .await
        .expect("relay");

    assert_eq!(harness.transport.events_named(CHANNEL_DATA).len(), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(harness.archive.uploads().is_empty());
}

#[tokio::test]
async fn displaced_sender_keeps_relaying_until_reacting() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let conn_b = harness.connect("conn-b", "tok-b").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.start(&conn_a, &target).await.expect("start a");
    harness.booths.start(&conn_b, &target).await.expect("start b");
    harness.transport.clear_events();

    // The displaced sender's reverse record is intact until its client
    // reacts to the takeover notice, so its audio still flows
    harness
        .audio
        .relay(&conn_a, Bytes::from_static(b"tail"))
        .await
        .expect("relay");
    assert_eq!(harness.transport.events_named(CHANNEL_DATA).len(), 1);
}

#[tokio::test]
async fn coordinator_routes_binary_frames() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::Ja);
    harness.booths.start(&conn, &target).await.expect("start");
    harness.transport.clear_events();

    harness
        .coordinator
        .handle_audio(&conn, Bytes::from_static(b"frame"))
        .await;

    assert_eq!(harness.transport.events_named(CHANNEL_DATA).len(), 1);
}
