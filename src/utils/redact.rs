use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s]+").expect("url pattern compiles")
});

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s\-()]{7,}\d").expect("phone pattern compiles"));

/// Replaces free-text fields of a request payload with a placeholder.
pub fn redact_sensitive_data(data: &JsonValue) -> JsonValue {
    match data {
        JsonValue::Object(map) => {
            let mut redacted_map = serde_json::Map::new();
            for (key, val) in map {
                let redacted_val = if is_sensitive_field(key) {
                    redact_string_value(val)
                } else {
                    redact_sensitive_data(val)
                };
                redacted_map.insert(key.clone(), redacted_val);
            }
            JsonValue::Object(redacted_map)
        }
        JsonValue::Array(arr) => JsonValue::Array(arr.iter().map(redact_sensitive_data).collect()),
        _ => data.clone(),
    }
}

/// Masks links and phone numbers, e.g. in a decoded QR payload.
pub fn redact_sensitive_text(text: &str) -> String {
    let without_urls = URL_PATTERN.replace_all(text, "[URL]");
    PHONE_PATTERN
        .replace_all(&without_urls, "[PHONE]")
        .into_owned()
}

fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    matches!(
        lower.as_str(),
        "message" | "content" | "response" | "text" | "info" | "schedule"
    )
}

fn redact_string_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if !s.is_empty() => JsonValue::String("[REDACTED]".to_string()),
        _ => value.clone(),
    }
}
