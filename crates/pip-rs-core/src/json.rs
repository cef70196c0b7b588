//! Lenient JSON extraction from model output.

use serde::de::DeserializeOwned;

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode the first JSON object embedded in `text`.
pub fn parse_embedded<T: DeserializeOwned>(text: &str) -> Option<T> {
    let object = extract_json_object(text)?;
    serde_json::from_str(object).ok()
}
