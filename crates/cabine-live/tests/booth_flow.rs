//! Booth hand-off flow tests.
//!
//! Drives the booth state machine end to end over the shared store and
//! transport, asserting on records, emissions, and cleanup:
//!
//! 1. **Single holder**: At most one active record per booth, whoever starts
//! 2. **Takeover**: Displacement notifies exactly the previous holder
//! 3. **Release paths**: stop, leave, and disconnect all empty the booth

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cabine_core::keys::{ActiveBoothKey, ActiveInterpreterKey};
use cabine_core::kv::get_json;
use cabine_core::{BoothId, Channel, ConnectionId, EmitTarget, Error, SessionId};
use cabine_live::protocol::{
    CHANNEL_STARTED, CHANNEL_STOPPED, INTERPRETER_ACCEPTED, INTERPRETER_JOINED, INTERPRETER_LEFT,
    INTERPRETER_MESSAGE, INTERPRETER_REQUESTED, INTERPRETER_ROSTER, INTERPRETER_STARTED,
    INTERPRETER_STOPPED, INTERPRETER_TAKEOVER,
};
use cabine_live::{ActiveBoothRecord, ActiveInterpreterRecord};
use cabine_test_utils::{
    assert_event_emitted, assert_no_event, event_json, expect_single_event, TestHarness,
};

fn booth(session: &str, channel: Channel) -> BoothId {
    BoothId::new(SessionId::new(session).expect("session id"), channel)
}

async fn active_record(harness: &TestHarness, booth: &BoothId) -> Option<ActiveBoothRecord> {
    get_json(harness.kv.as_ref(), ActiveBoothKey::booth(booth))
        .await
        .expect("store read")
}

async fn reverse_record(
    harness: &TestHarness,
    conn: &ConnectionId,
) -> Option<ActiveInterpreterRecord> {
    get_json(harness.kv.as_ref(), ActiveInterpreterKey::connection(conn))
        .await
        .expect("store read")
}

#[tokio::test]
async fn start_then_stop_leaves_booth_empty() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.join(&conn, &target).await.expect("join");
    harness.booths.start(&conn, &target).await.expect("start");

    let active = active_record(&harness, &target).await.expect("occupied");
    assert_eq!(active.connection_id, conn);
    assert_eq!(
        reverse_record(&harness, &conn).await.expect("reverse").booth,
        target
    );

    harness.booths.stop(&conn, &target).await.expect("stop");
    assert!(active_record(&harness, &target).await.is_none());
    assert!(reverse_record(&harness, &conn).await.is_none());

    // A joiner after the stop sees no active interpreter
    harness.transport.clear_events();
    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let late = harness.connect("conn-b", "tok-b").await;
    harness.booths.join(&late, &target).await.expect("rejoin");
    assert_no_event(
        &harness.transport.events_to_connection(&late),
        INTERPRETER_STARTED,
    );
}

#[tokio::test]
async fn joiner_sees_roster_and_active_interpreter() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    let ada = harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::Fr);

    harness.booths.join(&conn_a, &target).await.expect("join a");
    harness.booths.start(&conn_a, &target).await.expect("start");

    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_b = harness.connect("conn-b", "tok-b").await;
    harness.transport.clear_events();
    harness.booths.join(&conn_b, &target).await.expect("join b");

    // The joiner alone gets the roster of other occupants and the running
    // interpretation
    let targeted = harness.transport.events_to_connection(&conn_b);
    let roster = expect_single_event(&targeted, INTERPRETER_ROSTER);
    let occupants = &event_json(&roster)["occupants"];
    assert_eq!(occupants.as_array().expect("array").len(), 1);
    assert_eq!(occupants[0]["connectionId"], "conn-a");
    assert_eq!(occupants[0]["interpreter"]["email"], "ada@example.com");

    let started = expect_single_event(&targeted, INTERPRETER_STARTED);
    assert_eq!(event_json(&started)["interpreter"]["id"], ada.id);

    // The whole room learns about the joiner
    let room_events = harness.transport.events_to_room(&target.interpret_room());
    let joined = expect_single_event(&room_events, INTERPRETER_JOINED);
    assert_eq!(event_json(&joined)["connectionId"], "conn-b");
}

#[tokio::test]
async fn takeover_notifies_exactly_the_displaced_holder() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let bea = harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let conn_b = harness.connect("conn-b", "tok-b").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.join(&conn_a, &target).await.expect("join a");
    harness.booths.start(&conn_a, &target).await.expect("start a");
    harness.booths.join(&conn_b, &target).await.expect("join b");
    harness.transport.clear_events();

    harness.booths.start(&conn_b, &target).await.expect("start b");

    // Exactly one targeted takeover, addressed to the displaced holder,
    // carrying the new interpreter's identity
    let takeovers = harness.transport.events_named(INTERPRETER_TAKEOVER);
    assert_eq!(takeovers.len(), 1);
    assert_eq!(takeovers[0].target, EmitTarget::Connection(conn_a.clone()));
    assert_eq!(event_json(&takeovers[0])["connectionId"], "conn-b");
    assert_eq!(event_json(&takeovers[0])["interpreter"]["id"], bea.id);

    let active = active_record(&harness, &target).await.expect("occupied");
    assert_eq!(active.connection_id, conn_b);
    assert_eq!(active.interpreter, bea);

    // The displaced holder's reverse record survives until its own stop or
    // disconnect
    assert!(reverse_record(&harness, &conn_a).await.is_some());

    let room_events = harness.transport.events_to_room(&target.interpret_room());
    assert_event_emitted(&room_events, INTERPRETER_STARTED);
    let channel_events = harness.transport.events_to_room(&target.channel_room());
    assert_event_emitted(&channel_events, CHANNEL_STARTED);
}

#[tokio::test]
async fn restart_by_the_holder_is_not_a_takeover() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.start(&conn, &target).await.expect("start");
    harness.transport.clear_events();
    harness.booths.start(&conn, &target).await.expect("restart");

    assert!(harness.transport.events_named(INTERPRETER_TAKEOVER).is_empty());
    let active = active_record(&harness, &target).await.expect("occupied");
    assert_eq!(active.connection_id, conn);
}

#[tokio::test]
async fn stop_by_relief_interpreter_releases_the_holder() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let conn_b = harness.connect("conn-b", "tok-b").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.start(&conn_a, &target).await.expect("start");
    harness.transport.clear_events();

    // conn-b never went live; any registered interpreter may stop
    harness.booths.stop(&conn_b, &target).await.expect("stop");

    assert!(active_record(&harness, &target).await.is_none());
    // It is the holder's reverse record that goes, not the caller's
    assert!(reverse_record(&harness, &conn_a).await.is_none());

    let interpret_events = harness.transport.events_to_room(&target.interpret_room());
    assert_event_emitted(&interpret_events, INTERPRETER_STOPPED);
    let channel_events = harness.transport.events_to_room(&target.channel_room());
    assert_event_emitted(&channel_events, CHANNEL_STOPPED);
}

#[tokio::test]
async fn stop_on_empty_booth_still_broadcasts() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::De);

    harness.booths.stop(&conn, &target).await.expect("stop");

    // Clients settle into the stopped state even when a race already
    // emptied the booth
    assert_event_emitted(
        &harness.transport.events_to_room(&target.interpret_room()),
        INTERPRETER_STOPPED,
    );
    assert_event_emitted(
        &harness.transport.events_to_room(&target.channel_room()),
        CHANNEL_STOPPED,
    );
}

#[tokio::test]
async fn holder_leaving_releases_the_booth() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.join(&conn, &target).await.expect("join");
    harness.booths.start(&conn, &target).await.expect("start");
    harness.transport.clear_events();

    harness.booths.leave(&conn, &target).await.expect("leave");

    assert!(!harness.transport.is_member(&conn, &target.interpret_room()));
    assert!(active_record(&harness, &target).await.is_none());
    assert!(reverse_record(&harness, &conn).await.is_none());

    let interpret_events = harness.transport.events_to_room(&target.interpret_room());
    let left = expect_single_event(&interpret_events, INTERPRETER_LEFT);
    assert_eq!(event_json(&left)["connectionId"], "conn-a");
    assert_event_emitted(&interpret_events, INTERPRETER_STOPPED);
}

#[tokio::test]
async fn leave_by_a_visitor_keeps_the_booth_running() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let conn_b = harness.connect("conn-b", "tok-b").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.start(&conn_a, &target).await.expect("start");
    harness.booths.join(&conn_b, &target).await.expect("join b");
    harness.transport.clear_events();

    harness.booths.leave(&conn_b, &target).await.expect("leave b");

    assert!(active_record(&harness, &target).await.is_some());
    assert_no_event(
        &harness.transport.events_to_room(&target.interpret_room()),
        INTERPRETER_STOPPED,
    );
}

#[tokio::test]
async fn disconnect_releases_booth_and_leaves_rooms() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::Es);

    harness.booths.join(&conn, &target).await.expect("join");
    harness.booths.start(&conn, &target).await.expect("start");
    harness.transport.clear_events();

    harness.booths.connection_closed(&conn).await;

    assert!(active_record(&harness, &target).await.is_none());
    assert!(reverse_record(&harness, &conn).await.is_none());
    assert!(!harness.transport.is_member(&conn, &target.interpret_room()));

    let interpret_events = harness.transport.events_to_room(&target.interpret_room());
    assert_event_emitted(&interpret_events, INTERPRETER_STOPPED);
    let left = expect_single_event(&interpret_events, INTERPRETER_LEFT);
    assert_eq!(event_json(&left)["interpreter"]["email"], "ada@example.com");
    assert_event_emitted(
        &harness.transport.events_to_room(&target.channel_room()),
        CHANNEL_STOPPED,
    );
}

#[tokio::test]
async fn disconnect_after_concurrent_stop_is_quiet() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    harness.seed_interpreter("tok-b", "user-b", "bea@example.com");
    let conn_a = harness.connect("conn-a", "tok-a").await;
    let conn_b = harness.connect("conn-b", "tok-b").await;
    let target = booth("sess-1", Channel::En);

    harness.booths.join(&conn_a, &target).await.expect("join");
    harness.booths.start(&conn_a, &target).await.expect("start");
    harness.booths.stop(&conn_b, &target).await.expect("stop");
    harness.transport.clear_events();

    // The stop already cleared both records; the disconnect must not
    // broadcast a second stopped pair
    harness.booths.connection_closed(&conn_a).await;

    assert_no_event(&harness.transport.events(), INTERPRETER_STOPPED);
    assert_no_event(&harness.transport.events(), CHANNEL_STOPPED);
    assert_event_emitted(
        &harness.transport.events_to_room(&target.interpret_room()),
        INTERPRETER_LEFT,
    );
}

#[tokio::test]
async fn accept_and_message_are_stateless_broadcasts() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::Ja);

    harness.booths.accept(&conn, &target).await.expect("accept");
    harness
        .booths
        .message(&conn, &target, "switching in five")
        .await
        .expect("message");

    let room_events = harness.transport.events_to_room(&target.interpret_room());
    assert_event_emitted(&room_events, INTERPRETER_ACCEPTED);
    let message = expect_single_event(&room_events, INTERPRETER_MESSAGE);
    assert_eq!(event_json(&message)["text"], "switching in five");

    assert!(active_record(&harness, &target).await.is_none());
    assert!(reverse_record(&harness, &conn).await.is_none());
}

#[tokio::test]
async fn relief_request_carries_duration() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-1", Channel::En);

    harness
        .booths
        .request(&conn, &target, 300)
        .await
        .expect("request");

    let room_events = harness.transport.events_to_room(&target.interpret_room());
    let notice = expect_single_event(&room_events, INTERPRETER_REQUESTED);
    assert_eq!(event_json(&notice)["durationSeconds"], 300);

    let tracked = harness.events.events_named(INTERPRETER_REQUESTED);
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].payload["durationSeconds"], 300);
}

#[tokio::test]
async fn attendee_cannot_use_booth_operations() {
    let harness = TestHarness::new();
    harness.seed_session("sess-1", true);
    harness.seed_attendee("tok-c", "user-c", "cyd@example.com");
    let conn = harness.connect("conn-c", "tok-c").await;
    let target = booth("sess-1", Channel::En);

    let err = harness.booths.join(&conn, &target).await.expect_err("join");
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let harness = TestHarness::new();
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("ghost", Channel::En);

    let err = harness.booths.join(&conn, &target).await.expect_err("join");
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn booth_entry_ignores_interpretation_flag() {
    let harness = TestHarness::new();
    // Booth operations only need the session to exist; the flag gates the
    // listener side
    harness.seed_session("sess-2", false);
    harness.seed_interpreter("tok-a", "user-a", "ada@example.com");
    let conn = harness.connect("conn-a", "tok-a").await;
    let target = booth("sess-2", Channel::En);

    harness.booths.join(&conn, &target).await.expect("join");
    assert!(harness.transport.is_member(&conn, &target.interpret_room()));
}
