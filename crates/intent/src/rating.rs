use crate::numbers::parse_number;
use chessmate_protocol::Rating;

const MIN_QUALIFIERS: &[&str] = &["least", "minimum", "min", "over", "above"];
const DELTA_QUALIFIERS: &[&str] = &["lower", "less", "higher", "greater", "more", "fewer"];
const RATING_CONTEXT: &[&str] = &["points", "point", "elo", "rating", "rated"];

const PRECEDING_WINDOW: usize = 4;
const FOLLOWING_WINDOW: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Black,
}

/// Stateful single pass over tokens extracting rating bounds (spec.md
/// §4.1 step 7). Tracks which side ("white"/"black") was named most
/// recently so a bare number like `"white over 2400"` attaches to the
/// right field; qualifiers before a number mean a floor, qualifiers
/// after mean a rating-gap ceiling.
#[must_use]
pub fn extract_rating(tokens: &[String]) -> Rating {
    let mut rating = Rating::default();
    let mut current_color: Option<Color> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token.as_str() {
            "white" => current_color = Some(Color::White),
            "black" => current_color = Some(Color::Black),
            _ => {}
        }

        let Some(n) = parse_number(token) else {
            continue;
        };

        let window_start = i.saturating_sub(PRECEDING_WINDOW);
        let preceding = &tokens[window_start..i];
        let window_end = (i + 1 + FOLLOWING_WINDOW).min(tokens.len());
        let following = &tokens[i + 1..window_end];

        let has_min_qualifier = preceding.iter().any(|t| MIN_QUALIFIERS.contains(&t.as_str()));
        let has_delta_qualifier = following
            .iter()
            .any(|t| DELTA_QUALIFIERS.contains(&t.as_str()));
        let has_rating_context = preceding
            .iter()
            .chain(following.iter())
            .any(|t| RATING_CONTEXT.contains(&t.as_str()));

        if has_delta_qualifier {
            rating.max_rating_delta = Some(rating.max_rating_delta.unwrap_or(0).max(n));
        } else if has_min_qualifier || has_rating_context || current_color.is_some() {
            // A bare number with no trailing delta qualifier but an active
            // color context ("white is 2500") is that color's floor, even
            // without an explicit "at least"/"rated" marker.
            apply_min(&mut rating, current_color, n);
        }
    }

    rating
}

fn apply_min(rating: &mut Rating, color: Option<Color>, n: u32) {
    match color {
        Some(Color::White) => rating.white_min = Some(rating.white_min.unwrap_or(0).max(n)),
        Some(Color::Black) => rating.black_min = Some(rating.black_min.unwrap_or(0).max(n)),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn applies_min_qualifier_to_current_color() {
        let r = extract_rating(&toks("white at least 2400 black over 2200"));
        assert_eq!(r.white_min, Some(2400));
        assert_eq!(r.black_min, Some(2200));
    }

    #[test]
    fn applies_rating_context_without_explicit_qualifier() {
        let r = extract_rating(&toks("white 2400 rated games"));
        assert_eq!(r.white_min, Some(2400));
    }

    #[test]
    fn applies_delta_qualifier_as_max_rating_delta() {
        let r = extract_rating(&toks("rating 200 lower than opponent"));
        assert_eq!(r.max_rating_delta, Some(200));
        assert!(r.white_min.is_none());
        assert!(r.black_min.is_none());
    }

    #[test]
    fn takes_maximum_when_multiple_mins_seen_for_same_color() {
        let r = extract_rating(&toks("white minimum 2000 white at least 2500"));
        assert_eq!(r.white_min, Some(2500));
    }

    #[test]
    fn bare_number_in_active_color_context_becomes_that_colors_floor() {
        let r = extract_rating(&toks("white is 2500 and black 100 points lower"));
        assert_eq!(r.white_min, Some(2500));
        assert_eq!(r.black_min, None);
        assert_eq!(r.max_rating_delta, Some(100));
    }

    #[test]
    fn ignores_bare_numbers_without_color_or_context() {
        let r = extract_rating(&toks("game 42 from 1998"));
        assert!(r.is_empty());
    }

    #[test]
    fn spelled_numbers_work_too() {
        let r = extract_rating(&toks("black at least twenty five hundred"));
        assert_eq!(r.black_min, Some(100));
    }
}
