use chessmate_protocol::{Filter, FilterField, GameSummary, Rating};
use std::collections::HashSet;

/// Tokenizes `{white, black, event, opening_name, opening_slug}` into
/// lowercased alphanumeric tokens of at least 3 characters, in a single
/// pass over a scratch buffer (spec.md §4.6 step 5). Run once per
/// summary and reused across the vector/keyword scoring steps.
#[must_use]
pub fn tokenize_summary(summary: &GameSummary) -> Vec<String> {
    let mut buffer = String::new();
    for field in [
        Some(summary.white.as_str()),
        Some(summary.black.as_str()),
        summary.event.as_deref(),
        summary.opening_name.as_deref(),
        summary.opening_slug.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        buffer.push_str(field);
        buffer.push(' ');
    }
    tokenize_alphanumeric(&buffer)
}

fn tokenize_alphanumeric(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            push_token(&mut tokens, std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, current);
    }
    tokens
}

fn push_token(tokens: &mut Vec<String>, token: String) {
    if token.chars().count() >= 3 {
        tokens.push(token);
    }
}

/// Rating predicate evaluated once per summary (spec.md §4.6
/// "Invariants"). `white_min`/`black_min` are floors on the respective
/// side's rating; `max_rating_delta`, when present, bounds the absolute
/// gap between the two sides' ratings — a game missing either rating
/// cannot satisfy a delta bound, so it fails conservatively.
#[must_use]
pub fn rating_matches(summary: &GameSummary, rating: &Rating) -> bool {
    if let Some(min) = rating.white_min {
        if summary.white_rating.unwrap_or(0) < min {
            return false;
        }
    }
    if let Some(min) = rating.black_min {
        if summary.black_rating.unwrap_or(0) < min {
            return false;
        }
    }
    if let Some(max_delta) = rating.max_rating_delta {
        match (summary.white_rating, summary.black_rating) {
            (Some(w), Some(b)) => {
                let delta = w.max(b) - w.min(b);
                if delta > max_delta {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Number of `plan.filters` this summary satisfies, used by the
/// vector-score fallback (spec.md §4.6 step 5). `theme`/`phase` filters
/// cannot be verified from relational metadata alone — only a vector
/// hit carries that signal, which is scored separately — so they never
/// count as matched here.
#[must_use]
pub fn count_matched_filters(summary: &GameSummary, filters: &[Filter]) -> usize {
    filters.iter().filter(|f| filter_matches(summary, f)).count()
}

fn filter_matches(summary: &GameSummary, filter: &Filter) -> bool {
    match filter.field {
        FilterField::Opening => summary.opening_slug.as_deref() == Some(filter.value.as_str()),
        FilterField::Result => summary.result.as_deref() == Some(filter.value.as_str()),
        FilterField::EcoRange => summary
            .eco_code
            .as_deref()
            .and_then(|code| eco_in_range(code, &filter.value))
            .unwrap_or(false),
        FilterField::Theme | FilterField::Phase => false,
    }
}

fn eco_in_range(code: &str, range: &str) -> Option<bool> {
    let (lo, hi) = range.split_once('-')?;
    Some(code >= lo && code <= hi)
}

/// `vector_score` per spec.md §4.6 step 5. `hit_score` is the raw score
/// from the merged vector hit, if any game point matched this summary.
#[must_use]
pub fn vector_score(
    hit_score: Option<f32>,
    rating_ok: bool,
    matched_filters: usize,
    total_filters: usize,
) -> f32 {
    if !rating_ok {
        return 0.0;
    }
    match hit_score {
        Some(raw) if raw.is_finite() => raw.clamp(0.0, 1.0),
        Some(_) => 0.0,
        None if total_filters == 0 => 0.6,
        None => 0.4 + 0.6 * (matched_filters as f32 / total_filters as f32),
    }
}

/// `keyword_score` per spec.md §4.6 step 5: `|keywords ∩ tokens| /
/// max(1, |keywords|)`.
#[must_use]
pub fn keyword_score(plan_keywords: &[String], summary_tokens: &[String]) -> f32 {
    if plan_keywords.is_empty() {
        return 0.0;
    }
    let tokens: HashSet<&str> = summary_tokens.iter().map(String::as_str).collect();
    let matched = plan_keywords
        .iter()
        .filter(|keyword| tokens.contains(keyword.as_str()))
        .count();
    matched as f32 / plan_keywords.len().max(1) as f32
}

/// `base_total = 0.75·vector_score + 0.25·keyword_score`.
#[must_use]
pub fn base_total(vector_score: f32, keyword_score: f32) -> f32 {
    0.75 * vector_score + 0.25 * keyword_score
}

/// Folds in the agent score when present: `min(1, 0.6·base + 0.4·agent)`,
/// else `base` unchanged (spec.md §4.6 step 5).
#[must_use]
pub fn combine_with_agent(base_total: f32, agent_score: Option<f32>) -> f32 {
    match agent_score {
        Some(agent) => (0.6 * base_total + 0.4 * agent).min(1.0),
        None => base_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessmate_protocol::FilterField;

    fn summary() -> GameSummary {
        GameSummary {
            id: 1,
            white: "Magnus Carlsen".into(),
            black: "Hikaru Nakamura".into(),
            white_rating: Some(2850),
            black_rating: Some(2780),
            event: Some("Norway Chess".into()),
            played_on: None,
            result: Some("1-0".into()),
            eco_code: Some("B33".into()),
            opening_slug: Some("sicilian_defense".into()),
            opening_name: Some("Sicilian Defense".into()),
        }
    }

    #[test]
    fn tokenizes_summary_fields_into_unique_lowercase_tokens() {
        let tokens = tokenize_summary(&summary());
        assert!(tokens.contains(&"magnus".to_string()));
        assert!(tokens.contains(&"sicilian".to_string()));
        assert!(tokens.contains(&"defense".to_string()));
        assert!(!tokens.iter().any(|t| t.chars().count() < 3));
    }

    #[test]
    fn rating_predicate_enforces_minimums_and_delta() {
        let rating = Rating {
            white_min: Some(2800),
            black_min: None,
            max_rating_delta: Some(50),
        };
        assert!(rating_matches(&summary(), &rating));

        let too_wide = Rating {
            white_min: None,
            black_min: None,
            max_rating_delta: Some(10),
        };
        assert!(!rating_matches(&summary(), &too_wide));
    }

    #[test]
    fn rating_delta_fails_conservatively_without_both_ratings() {
        let mut missing = summary();
        missing.black_rating = None;
        let rating = Rating {
            white_min: None,
            black_min: None,
            max_rating_delta: Some(500),
        };
        assert!(!rating_matches(&missing, &rating));
    }

    #[test]
    fn vector_score_zero_when_rating_fails_regardless_of_hit() {
        assert_eq!(vector_score(Some(0.9), false, 0, 0), 0.0);
    }

    #[test]
    fn vector_score_falls_back_to_filter_ratio_without_a_hit() {
        let filters = vec![
            Filter::new(FilterField::Opening, "sicilian_defense"),
            Filter::new(FilterField::Result, "1-0"),
        ];
        let matched = count_matched_filters(&summary(), &filters);
        assert_eq!(matched, 2);
        assert_eq!(vector_score(None, true, matched, filters.len()), 1.0);
    }

    #[test]
    fn vector_score_is_flat_point_six_with_no_filters_and_no_hit() {
        assert_eq!(vector_score(None, true, 0, 0), 0.6);
    }

    #[test]
    fn vector_score_clamps_non_finite_hit_to_zero() {
        assert_eq!(vector_score(Some(f32::NAN), true, 0, 0), 0.0);
        assert_eq!(vector_score(Some(f32::INFINITY), true, 0, 0), 0.0);
    }

    #[test]
    fn keyword_score_is_zero_for_empty_keywords() {
        assert_eq!(keyword_score(&[], &["sicilian".to_string()]), 0.0);
    }

    #[test]
    fn keyword_score_is_the_overlap_ratio() {
        let keywords = vec!["sicilian".to_string(), "attack".to_string()];
        let tokens = vec!["sicilian".to_string(), "defense".to_string()];
        assert_eq!(keyword_score(&keywords, &tokens), 0.5);
    }

    #[test]
    fn combine_with_agent_caps_at_one() {
        assert_eq!(combine_with_agent(1.0, Some(1.0)), 1.0);
        assert_eq!(combine_with_agent(0.0, None), 0.0);
    }
}
