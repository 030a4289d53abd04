//! Parsing helpers for loosely formatted oracle output.

use serde_json::Value;

/// Pull the first JSON object out of free text.
///
/// Generative backends tend to wrap JSON in markdown fences or add a sentence
/// around it; everything outside the outermost braces is ignored.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Read a `[lon, lat]` ring from either `[[lon, lat], ...]` or
/// `[[[lon, lat], ...]]`. Only the outer ring of a polygon is kept.
pub fn ring_from_value(value: &Value) -> Option<Vec<[f64; 2]>> {
    if let Ok(mut rings) = serde_json::from_value::<Vec<Vec<[f64; 2]>>>(value.clone()) {
        if rings.is_empty() {
            return None;
        }
        return Some(rings.swap_remove(0));
    }
    serde_json::from_value::<Vec<[f64; 2]>>(value.clone())
        .ok()
        .filter(|ring| !ring.is_empty())
}
