use crate::numbers::parse_number;
use chessmate_protocol::DEFAULT_LIMIT;

const QUALIFIERS: &[&str] = &["top", "first", "show", "list", "give", "find", "return"];
const MAX_INLINE_LIMIT: u32 = 50;

/// How far back a qualifier may sit from the number and still count —
/// "show me 5 random games" has two filler tokens (`me`, nothing)
/// between `show` and `5`, so a strict-adjacency check misses it.
const PRECEDING_WINDOW: usize = 4;

/// Extract a result-count limit from the token stream (spec.md §4.1 step
/// 3). An inline phrase like `"top 10"` or `"20 games"` wins over the
/// request-supplied `limit`, which in turn wins over `default_limit`.
#[must_use]
pub fn extract_limit(tokens: &[String], requested: Option<usize>, max_limit: usize) -> usize {
    for (i, token) in tokens.iter().enumerate() {
        let Some(n) = parse_number(token) else {
            continue;
        };
        if n == 0 || n > MAX_INLINE_LIMIT {
            continue;
        }
        let window_start = i.saturating_sub(PRECEDING_WINDOW);
        let preceded_by_qualifier = tokens[window_start..i]
            .iter()
            .any(|t| QUALIFIERS.contains(&t.as_str()));
        let followed_by_games = tokens[i + 1..].iter().any(|t| t == "games" || t == "game");
        if preceded_by_qualifier || followed_by_games {
            return n as usize;
        }
    }

    requested
        .map(|n| n.clamp(1, max_limit))
        .unwrap_or(DEFAULT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn adopts_qualifier_preceded_limit() {
        assert_eq!(extract_limit(&toks("top 10 sicilian games"), None, 500), 10);
    }

    #[test]
    fn adopts_games_suffixed_limit() {
        assert_eq!(extract_limit(&toks("show me 25 games please"), None, 500), 25);
    }

    #[test]
    fn adopts_limit_across_filler_words_on_both_sides() {
        assert_eq!(extract_limit(&toks("show me 5 random games"), None, 500), 5);
    }

    #[test]
    fn ignores_limits_above_inline_cap() {
        assert_eq!(
            extract_limit(&toks("top 500 games"), Some(20), 500),
            20
        );
    }

    #[test]
    fn falls_back_to_requested_then_default() {
        assert_eq!(extract_limit(&toks("magnus carlsen games"), Some(30), 500), 30);
        assert_eq!(extract_limit(&toks("magnus carlsen games"), None, 500), 50);
    }
}
