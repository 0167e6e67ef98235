//! Bounded text views used in reports and aggregates

use serde_json::Value;

/// Maximum characters kept by a summary view
pub const SUMMARY_CHARS: usize = 100;

const ELLIPSIS: &str = "...";

/// Keep the first `max_chars` characters, appending `...` if anything was cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &text[..idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Render a value for display: strings verbatim, everything else as compact JSON
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shorten a payload for display.
///
/// Objects are summarised per key. A value whose rendering exceeds the limit
/// becomes a truncated string; shorter values are kept as they were.
pub fn summarize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), summarize_scalar(v)))
                .collect(),
        ),
        other => summarize_scalar(other),
    }
}

fn summarize_scalar(value: &Value) -> Value {
    let rendered = render(value);
    if rendered.chars().count() > SUMMARY_CHARS {
        Value::String(truncate(&rendered, SUMMARY_CHARS))
    } else {
        value.clone()
    }
}
