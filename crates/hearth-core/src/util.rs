//! Text and clock helpers used by the store, config and transport layers.

/// Trimmed text, or `None` when nothing but whitespace was given.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Whether `value` names an `http://` or `https://` location.
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// First 180 characters of a response body, for log lines.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Wall-clock time as Unix milliseconds, the unit of `lastModified`.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
