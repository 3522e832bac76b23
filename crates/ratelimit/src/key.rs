/// Normalize a client key per spec.md §4.2 step 1: trim, lowercase,
/// replace anything outside `[A-Za-z0-9.:_]` with `_`, fall back to
/// `"unknown"` for an empty result.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }

    let sanitized: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '.' || lower == ':' || lower == '_' {
                lower
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}
