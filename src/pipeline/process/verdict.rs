use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

/// Filter-stage decision as requested by the filter prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterVerdict {
    #[serde(default)]
    pub worth: bool,
    #[serde(default)]
    pub reason: String,
}

static FENCE: OnceLock<Regex> = OnceLock::new();

/// Unwrap a reply of the form ```` ```json {...} ``` ```` down to its body.
fn strip_fence(reply: &str) -> &str {
    let re = FENCE.get_or_init(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("fence regex"));
    match re.captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => reply.trim(),
    }
}

/// Decode a filter reply. Never fails: a reply that is not the expected JSON is read as prose,
/// rejected iff it mentions the marker phrase or contains "no" anywhere (case-insensitive).
pub fn decode_verdict(reply: &str, reject_marker: &str) -> FilterVerdict {
    if let Ok(v) = serde_json::from_str::<FilterVerdict>(strip_fence(reply)) {
        return v;
    }
    let lower = reply.to_lowercase();
    let marker = reject_marker.trim().to_lowercase();
    let rejected = (!marker.is_empty() && lower.contains(&marker)) || lower.contains("no");
    FilterVerdict { worth: !rejected, reason: String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "not worth";

    #[test]
    fn structured_reply_is_taken_verbatim() {
        let v = decode_verdict(r#"{"worth": false, "reason": "advert"}"#, MARKER);
        assert_eq!(v, FilterVerdict { worth: false, reason: "advert".into() });
        let v = decode_verdict(r#"{"worth": true}"#, MARKER);
        assert!(v.worth);
        assert!(v.reason.is_empty());
    }

    #[test]
    fn object_without_worth_is_a_rejection_with_reason() {
        let v = decode_verdict(r#"{"reason": "great read"}"#, MARKER);
        assert_eq!(v, FilterVerdict { worth: false, reason: "great read".into() });
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let v = decode_verdict("```json\n{\"worth\": true, \"reason\": \"big release\"}\n```", MARKER);
        assert_eq!(v, FilterVerdict { worth: true, reason: "big release".into() });
    }

    #[test]
    fn prose_fallback_uses_marker_and_no_substring() {
        assert!(!decode_verdict("This is NOT WORTH reading.", MARKER).worth);
        assert!(!decode_verdict("No.", MARKER).worth);
        // "no" matches anywhere, including inside words
        assert!(!decode_verdict("Yes, it covers a new announcement", MARKER).worth);
        assert!(decode_verdict("Yes, definitely read it", MARKER).worth);
        assert!(decode_verdict("yes", MARKER).reason.is_empty());
    }

    #[test]
    fn custom_marker_is_honoured() {
        assert!(!decode_verdict("skip this one", "skip").worth);
        assert!(decode_verdict("great read", "").worth);
    }
}
