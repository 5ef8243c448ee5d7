//! Segment normalization for heterogeneous forward-node payloads.
//!
//! Platform versions disagree on how a node's content is encoded: sometimes
//! a structured segment array, sometimes the same array JSON-encoded into a
//! string, sometimes a bare string. Each shape is decoded by one pure
//! function into zero-or-more typed segments, so new upstream shapes can be
//! added without touching callers.

use serde_json::Value;

/// One typed unit of content inside a forward node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// An image locator (URL, or file reference on older platforms).
    Image(String),
}

/// Normalize one node's raw payload into an ordered segment list.
///
/// Never errors: malformed shapes degrade to skipped segments or an empty
/// list rather than aborting the whole transcript.
pub fn normalize_payload(raw: &Value) -> Vec<Segment> {
    match raw {
        Value::Array(items) => decode_segment_array(items),
        Value::String(text) => decode_string_payload(text),
        _ => Vec::new(),
    }
}

/// Decode the structured case: a list of `{type, data}` maps.
fn decode_segment_array(items: &[Value]) -> Vec<Segment> {
    let mut segments = Vec::new();

    for item in items {
        match item["type"].as_str() {
            Some("text") => {
                if let Some(text) = item["data"]["text"].as_str()
                    && !text.is_empty()
                {
                    segments.push(Segment::Text(text.to_string()));
                }
            }
            Some("image") => {
                // Newer platforms send `url`; older ones only `file`.
                let locator = item["data"]["url"]
                    .as_str()
                    .or_else(|| item["data"]["file"].as_str());
                if let Some(locator) = locator {
                    segments.push(Segment::Image(locator.to_string()));
                }
            }
            _ => {}
        }
    }

    segments
}

/// Decode a string payload: a JSON-encoded segment array, or literal text.
fn decode_string_payload(text: &str) -> Vec<Segment> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => decode_segment_array(&items),
        Ok(other) => {
            tracing::debug!(kind = ?value_kind(&other), "string payload parsed to non-array, treating as text");
            vec![Segment::Text(text.to_string())]
        }
        Err(_) => vec![Segment::Text(text.to_string())],
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
