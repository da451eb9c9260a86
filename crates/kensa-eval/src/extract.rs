//! Locating the judgment object inside free-form judge output.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
});

static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").expect("valid regex"));

/// Find the first JSON-object-looking span in `text`.
///
/// A fenced block (```` ``` ```` or ```` ```json ````, any case) wins and is
/// matched non-greedily. Otherwise the span runs from the first `{` to the
/// last `}`, which may swallow unrelated trailing braces. The result is
/// trimmed and is not guaranteed to be valid JSON.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    if text.is_empty() {
        return None;
    }

    if let Some(m) = FENCED_OBJECT.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str().trim());
    }

    BRACE_SPAN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}
