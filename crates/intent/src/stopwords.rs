use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Common English function words plus the query-framing verbs/qualifiers
/// already consumed by limit/rating extraction, excluded from keyword
/// extraction (spec.md §4.1 step 6).
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "has", "have",
        "had", "but", "not", "you", "your", "all", "any", "can", "did", "does", "into", "out",
        "over", "under", "about", "against", "between", "than", "then", "there", "their", "them",
        "these", "those", "what", "when", "where", "which", "who", "why", "how", "its", "it's",
        "him", "her", "his", "she", "they", "will", "would", "could", "should", "been", "being",
        "top", "first", "show", "list", "give", "find", "return", "games", "game", "least",
        "minimum", "min", "above", "least", "lower", "less", "higher", "greater", "more", "fewer",
        "points", "point", "elo", "rating", "rated", "win", "wins", "won", "victory", "draw",
        "drawn", "white", "black",
    ]
    .into_iter()
    .collect()
});

#[must_use]
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_function_words_and_query_framing() {
        assert!(is_stopword("the"));
        assert!(is_stopword("top"));
        assert!(is_stopword("least"));
    }

    #[test]
    fn leaves_content_words_alone() {
        assert!(!is_stopword("sacrifice"));
        assert!(!is_stopword("kasparov"));
    }
}
