//! Custom assertion helpers for integration tests.

use cabine_core::{EmittedEvent, EventPayload};

use crate::storage::KvOp;

/// Asserts that at least one emission with the given name is present.
///
/// # Panics
///
/// Panics if no emission matches.
pub fn assert_event_emitted(events: &[EmittedEvent], name: &str) {
    assert!(
        events.iter().any(|e| e.event == name),
        "Expected a '{name}' emission, found {events:?}",
    );
}

/// Asserts that no emission with the given name is present.
///
/// # Panics
///
/// Panics if any emission matches.
pub fn assert_no_event(events: &[EmittedEvent], name: &str) {
    assert!(
        !events.iter().any(|e| e.event == name),
        "Expected no '{name}' emission, found {events:?}",
    );
}

/// Asserts that exactly one emission with the given name is present and
/// returns it.
///
/// # Panics
///
/// Panics if the name matches zero or several emissions.
#[must_use]
pub fn expect_single_event(events: &[EmittedEvent], name: &str) -> EmittedEvent {
    let matching: Vec<&EmittedEvent> = events.iter().filter(|e| e.event == name).collect();
    assert_eq!(
        matching.len(),
        1,
        "Expected exactly one '{name}' emission, found {events:?}",
    );
    matching[0].clone()
}

/// Returns the JSON payload of an emission.
///
/// # Panics
///
/// Panics if the payload is a binary frame.
#[must_use]
pub fn event_json(event: &EmittedEvent) -> &serde_json::Value {
    match &event.payload {
        EventPayload::Json(value) => value,
        EventPayload::Binary(_) => panic!("Expected JSON payload on '{}'", event.event),
    }
}

/// Asserts that store operations contain expected patterns.
///
/// # Panics
///
/// Panics if expected operations are not found.
pub fn assert_kv_ops_contain(ops: &[KvOp], expected: &[(&str, &str)]) {
    for (op_type, key_prefix) in expected {
        let found = ops.iter().any(|op| {
            let (actual_type, actual_key) = match op {
                KvOp::Get { key } => ("get", key.as_str()),
                KvOp::Put { key, .. } => ("put", key.as_str()),
                KvOp::Delete { key } => ("delete", key.as_str()),
                KvOp::Expire { key, .. } => ("expire", key.as_str()),
            };
            actual_type == *op_type && actual_key.starts_with(key_prefix)
        });
        assert!(
            found,
            "Expected {op_type} operation on key starting with '{key_prefix}', not found in {ops:?}",
        );
    }
}

/// Asserts that no store operation touched a given key prefix.
///
/// Useful for verifying invariants like "channel membership never touches
/// booth records".
///
/// # Panics
///
/// Panics if any operation touched the given prefix.
pub fn assert_kv_ops_exclude(ops: &[KvOp], forbidden_prefix: &str) {
    for op in ops {
        let key = match op {
            KvOp::Get { key }
            | KvOp::Put { key, .. }
            | KvOp::Delete { key }
            | KvOp::Expire { key, .. } => key,
        };
        assert!(
            !key.starts_with(forbidden_prefix),
            "Operation on forbidden key: {key} (prefix: {forbidden_prefix})",
        );
    }
}
