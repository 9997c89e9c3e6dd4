//! Canonical JSON encoding — the sole input to content addressing.
//!
//! `encode` turns any `serde_json::Value` into a byte string with object
//! keys sorted lexicographically, no insignificant whitespace, and non-ASCII
//! characters emitted unescaped. The same value must always encode to the
//! same bytes, independent of field insertion order, so that `object_id` is
//! a stable identity.

use serde::Serialize;
use serde_json::Value;

use crate::hash::Oid;

/// Recursively sort every object's keys so that serialization order no
/// longer depends on insertion order.
fn canonicalize(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                canonicalize(item);
            }
        }
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = serde_json::Map::with_capacity(entries.len());
            for (key, mut v) in entries {
                canonicalize(&mut v);
                sorted.insert(key, v);
            }
            *map = sorted;
        }
        _ => {}
    }
}

/// Serialize a value to its canonical byte encoding.
///
/// `serde_json::to_vec` already emits the tightest separators (`,` and `:`
/// with no surrounding spaces) and does not escape non-ASCII text, so once
/// keys are sorted this is a direct byte-stable encoding.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut v = serde_json::to_value(value)?;
    canonicalize(&mut v);
    serde_json::to_vec(&v)
}

/// Encode an already-built `serde_json::Value` (skips the `to_value` hop).
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut v = value.clone();
    canonicalize(&mut v);
    serde_json::to_vec(&v).expect("canonicalized serde_json::Value always serializes")
}

/// Content address of a serializable value: `sha256(encode(value))`.
pub fn object_id<T: Serialize>(value: &T) -> Result<Oid, serde_json::Error> {
    let bytes = encode(value)?;
    Ok(Oid::of_bytes(&bytes))
}
