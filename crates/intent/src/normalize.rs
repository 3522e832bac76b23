/// Lowercase and fold every non-alphanumeric character to a space, then
/// drop ASCII apostrophes outright so `"white's"` becomes `"whites"`
/// rather than `"white s"` (spec.md §4.1 step 1).
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\'' {
            continue;
        }
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            out.push(lower);
        } else if lower.is_whitespace() || !lower.is_ascii() {
            out.push(' ');
        } else {
            out.push(' ');
        }
    }
    out
}

/// Split on whitespace, discarding empty tokens (spec.md §4.1 step 2).
#[must_use]
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
