use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::constants::HUMAN_READABLE_TAG_KEY;

/// Human text, optional whitespace, then a `{...}` JSON blob
static HUMAN_READABLE_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\{.*\}").expect("valid tag regex"));

/// Extracts a human readable label from a freeform message tag.
///
/// Tags are either plain text, a JSON object carrying the label under
/// `__rt__.tag`, or human text followed by a JSON blob. Malformed JSON is not
/// an error: the raw tag is returned as-is.
pub fn parse_to_human_readable_tag(tag: Option<&str>) -> Option<String> {
    let tag = tag.filter(|t| !t.is_empty())?;

    if tag.starts_with('{') && tag.ends_with('}') {
        let parsed = match serde_json::from_str::<Value>(tag) {
            Ok(v) => v,
            Err(_) => return Some(tag.to_string()),
        };
        return match parsed.get(HUMAN_READABLE_TAG_KEY) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) => None,
            Some(other) => Some(other.to_string()),
            None => Some(tag.to_string()),
        };
    }

    if let Some(captures) = HUMAN_READABLE_TAG_REGEX.captures(tag) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    Some(tag.to_string())
}

/// Like [`parse_to_human_readable_tag`], but discards results that are still
/// raw JSON or empty so they never end up as a tag value.
pub fn usable_tag(tag: Option<&str>) -> Option<String> {
    parse_to_human_readable_tag(tag).filter(|t| !t.is_empty() && !t.starts_with('{'))
}
