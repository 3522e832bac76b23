//! # Chessmate Intent Analyzer
//!
//! A pure, total function turning free text into a [`QueryPlan`]. Never
//! performs I/O, never fails, never depends on the clock or randomness —
//! the hybrid executor and the HTTP layer are the only callers that touch
//! the outside world.

mod catalogue;
mod limit;
mod normalize;
mod numbers;
mod rating;
mod stopwords;

use chessmate_protocol::{QueryPlan, QueryRequest, MAX_LIMIT};

/// Analyse a raw [`QueryRequest`] into a structured [`QueryPlan`]
/// (spec.md §4.1, steps 1-8). Malformed or empty input produces a plan
/// with empty keywords and no filters rather than an error.
#[must_use]
pub fn analyse(request: &QueryRequest) -> QueryPlan {
    let cleaned_text = normalize::normalize(&request.text);
    let tokens = normalize::tokenize(&cleaned_text);

    let limit = limit::extract_limit(&tokens, request.limit, MAX_LIMIT);
    let offset = request.offset.unwrap_or(0);

    let filters = catalogue::detect_filters(&cleaned_text);
    let rating = rating::extract_rating(&tokens);

    let mut keywords = Vec::new();
    for token in &tokens {
        if token.chars().count() >= 3 && !stopwords::is_stopword(token) && !keywords.contains(token)
        {
            keywords.push(token.clone());
        }
    }

    QueryPlan::new(cleaned_text, keywords, filters, rating, limit, offset)
}
