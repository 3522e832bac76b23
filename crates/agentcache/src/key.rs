use chessmate_protocol::{GameSummary, QueryPlan};
use sha2::{Digest, Sha256};

/// Deterministic digest over the fields spec.md §4.4 names: the plan's
/// cleaned text/keywords/limit/rating, plus the candidate's identity
/// (opening, result, PGN). Stable across processes since it never hashes
/// a pointer, timestamp, or process-local id.
#[must_use]
pub fn cache_key(plan: &QueryPlan, summary: &GameSummary, pgn: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plan.cleaned_text.as_bytes());
    hasher.update(b"\0");
    for keyword in &plan.keywords {
        hasher.update(keyword.as_bytes());
        hasher.update(b",");
    }
    hasher.update(b"\0");
    hasher.update(plan.limit.to_le_bytes());
    hasher.update(plan.rating.white_min.unwrap_or(0).to_le_bytes());
    hasher.update(plan.rating.black_min.unwrap_or(0).to_le_bytes());
    hasher.update(plan.rating.max_rating_delta.unwrap_or(0).to_le_bytes());
    hasher.update(b"\0");
    hasher.update(summary.opening_slug.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(summary.result.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(pgn.as_bytes());

    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
