//! Lenient JSON object extraction for model output.

use serde_json::{Map, Value};

/// Parse `text` as a JSON object. Models often wrap the object in prose or
/// code fences, so when the strict parse fails the slice between the first
/// `{` and the last `}` is tried instead.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
