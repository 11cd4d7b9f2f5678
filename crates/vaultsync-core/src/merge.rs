//! Structured merge for key-value documents.
//!
//! Rules, applied recursively:
//! - object vs object: merge key by key
//! - array vs array: set union, local elements first, duplicates dropped
//! - anything else present on both sides: the local value wins
//! - a key present on one side only is kept as-is
//!
//! A document that is not valid JSON, or whose top level is not an object,
//! is treated as `{}`.

use serde_json::{Map, Value};

/// Merge two JSON documents given as bytes. Never fails.
pub fn merge_json(local: &[u8], remote: &[u8]) -> Vec<u8> {
    let merged = merge_values(parse_object(local), parse_object(remote));
    // Serializing a Value built from parsed JSON cannot fail.
    let mut out = serde_json::to_vec_pretty(&merged).unwrap_or_else(|_| b"{}".to_vec());
    out.push(b'\n');
    out
}

/// Merge two JSON values with local precedence on scalars.
pub fn merge_values(local: Value, remote: Value) -> Value {
    match (local, remote) {
        (Value::Object(local), Value::Object(remote)) => Value::Object(merge_objects(local, remote)),
        (Value::Array(local), Value::Array(remote)) => Value::Array(union(local, remote)),
        (local, _) => local,
    }
}

fn merge_objects(mut local: Map<String, Value>, remote: Map<String, Value>) -> Map<String, Value> {
    for (key, remote_value) in remote {
        let merged = match local.remove(&key) {
            Some(local_value) => merge_values(local_value, remote_value),
            None => remote_value,
        };
        local.insert(key, merged);
    }
    local
}

fn union(local: Vec<Value>, remote: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(local.len() + remote.len());
    for value in local.into_iter().chain(remote) {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn parse_object(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}
