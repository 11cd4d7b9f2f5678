//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};
use vaultsync_core::ResourceType;

/// Generate a ResourceType.
pub fn resource_type() -> impl Strategy<Value = ResourceType> {
    prop_oneof![
        Just(ResourceType::Sessions),
        Just(ResourceType::Agents),
        Just(ResourceType::Settings),
    ]
}

/// A file-name-safe id segment.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9_-]{0,15}"
}

/// A session id, `project/session`.
pub fn session_id() -> impl Strategy<Value = String> {
    (segment(), segment()).prop_map(|(project, session)| format!("{project}/{session}"))
}

/// Any non-empty id, including the characters that need escaping in
/// remote keys.
pub fn raw_id() -> impl Strategy<Value = String> {
    r"[a-zA-Z0-9%/\\._ -]{1,24}"
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A non-empty text payload, as artifacts on disk are.
pub fn text_payload() -> impl Strategy<Value = String> {
    "[ -~\n]{1,256}"
}

/// A settings document with a `tags` array and a `mode` scalar.
pub fn settings_doc() -> impl Strategy<Value = Value> {
    (prop::collection::vec("[a-z]{1,6}", 0..6), "[a-z]{1,6}")
        .prop_map(|(tags, mode)| json!({ "tags": tags, "mode": mode }))
}
