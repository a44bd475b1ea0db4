//! Safe-path access over raw vendor JSON
//!
//! Vendor payloads omit fields inconsistently across models and firmware
//! versions, so every optional read degrades to a default instead of
//! failing. `require` is the one hard accessor, reserved for nodes whose
//! absence means the vendor broke its contract.

use serde_json::Value;

use crate::errors::NormalizeError;

/// Fetch the node at a JSON pointer, or fail with `MalformedPayload`.
pub fn require<'a>(root: &'a Value, pointer: &'static str) -> Result<&'a Value, NormalizeError> {
    root.pointer(pointer)
        .ok_or(NormalizeError::MalformedPayload(pointer))
}

/// Boolean flag: JSON `true` or any non-zero number.
pub fn flag_at(root: &Value, pointer: &str) -> bool {
    match root.pointer(pointer) {
        Some(Value::Bool(value)) => *value,
        Some(Value::Number(value)) => value.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// Equality test against a sentinel code. Vendor tri-state enums must not
/// be read through truthiness.
pub fn code_eq(root: &Value, pointer: &str, sentinel: u64) -> bool {
    u64_at(root, pointer) == Some(sentinel)
}

/// Number at the pointer; numeric strings are accepted, the vendor mixes both.
pub fn f64_at(root: &Value, pointer: &str) -> Option<f64> {
    match root.pointer(pointer)? {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.parse().ok(),
        _ => None,
    }
}

pub fn u64_at(root: &Value, pointer: &str) -> Option<u64> {
    match root.pointer(pointer)? {
        Value::Number(value) => value.as_u64(),
        Value::String(value) => value.parse().ok(),
        _ => None,
    }
}

pub fn u32_at(root: &Value, pointer: &str) -> Option<u32> {
    u64_at(root, pointer).and_then(|value| u32::try_from(value).ok())
}

pub fn str_at<'a>(root: &'a Value, pointer: &str) -> Option<&'a str> {
    root.pointer(pointer).and_then(Value::as_str)
}

pub fn array_at<'a>(root: &'a Value, pointer: &str) -> Option<&'a Vec<Value>> {
    root.pointer(pointer).and_then(Value::as_array)
}
