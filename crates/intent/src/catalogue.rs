use chessmate_protocol::{Filter, FilterField};
use once_cell::sync::Lazy;

struct OpeningEntry {
    phrases: &'static [&'static str],
    slug: &'static str,
    eco_range: &'static str,
}

/// Closed opening catalogue (spec.md §4.1 step 4: "opening and eco_range
/// from a closed opening catalogue"). Phrases are matched against
/// whitespace-padded `cleaned_text`, longest phrase list first so a more
/// specific name (e.g. "ruy lopez") is not shadowed by a shorter one.
static OPENINGS: Lazy<Vec<OpeningEntry>> = Lazy::new(|| {
    vec![
        OpeningEntry {
            phrases: &["sicilian defense", "sicilian defence", "sicilian"],
            slug: "sicilian_defense",
            eco_range: "B20-B99",
        },
        OpeningEntry {
            phrases: &["french defense", "french defence", "french"],
            slug: "french_defense",
            eco_range: "C00-C19",
        },
        OpeningEntry {
            phrases: &["caro kann defense", "caro kann"],
            slug: "caro_kann_defense",
            eco_range: "B10-B19",
        },
        OpeningEntry {
            phrases: &["kings indian defense", "kings indian"],
            slug: "kings_indian_defense",
            eco_range: "E60-E99",
        },
        OpeningEntry {
            phrases: &["queens gambit declined", "queens gambit"],
            slug: "queens_gambit",
            eco_range: "D06-D69",
        },
        OpeningEntry {
            phrases: &["ruy lopez", "spanish opening"],
            slug: "ruy_lopez",
            eco_range: "C60-C99",
        },
        OpeningEntry {
            phrases: &["italian game"],
            slug: "italian_game",
            eco_range: "C50-C59",
        },
        OpeningEntry {
            phrases: &["english opening"],
            slug: "english_opening",
            eco_range: "A10-A39",
        },
        OpeningEntry {
            phrases: &["nimzo indian defense", "nimzo indian"],
            slug: "nimzo_indian_defense",
            eco_range: "E20-E59",
        },
        OpeningEntry {
            phrases: &["scandinavian defense", "scandinavian"],
            slug: "scandinavian_defense",
            eco_range: "B01-B01",
        },
    ]
});

struct PhraseEntry {
    phrases: &'static [&'static str],
    field: FilterField,
    value: &'static str,
}

static THEMES: Lazy<Vec<PhraseEntry>> = Lazy::new(|| {
    vec![
        PhraseEntry {
            phrases: &["queenside majority"],
            field: FilterField::Theme,
            value: "queenside_majority",
        },
        PhraseEntry {
            phrases: &["sacrifice", "sacrifices", "sacrificial"],
            field: FilterField::Theme,
            value: "sacrifice",
        },
        PhraseEntry {
            phrases: &["tactics", "tactical"],
            field: FilterField::Theme,
            value: "tactics",
        },
        PhraseEntry {
            phrases: &["king attack", "king hunt", "attack on the king"],
            field: FilterField::Theme,
            value: "king_attack",
        },
        PhraseEntry {
            phrases: &["zugzwang"],
            field: FilterField::Theme,
            value: "zugzwang",
        },
        PhraseEntry {
            phrases: &["fortress"],
            field: FilterField::Theme,
            value: "fortress",
        },
        PhraseEntry {
            phrases: &["passed pawn", "passed pawns"],
            field: FilterField::Theme,
            value: "passed_pawn",
        },
        PhraseEntry {
            phrases: &["opposite colored bishops", "opposite colored bishop"],
            field: FilterField::Theme,
            value: "opposite_colored_bishops",
        },
    ]
});

static PHASES: Lazy<Vec<PhraseEntry>> = Lazy::new(|| {
    vec![
        PhraseEntry {
            phrases: &["middlegame", "middle game"],
            field: FilterField::Phase,
            value: "middlegame",
        },
        PhraseEntry {
            phrases: &["endgame", "end game"],
            field: FilterField::Phase,
            value: "endgame",
        },
    ]
});

static RESULTS: Lazy<Vec<PhraseEntry>> = Lazy::new(|| {
    vec![
        PhraseEntry {
            phrases: &["white win", "white wins", "white victory"],
            field: FilterField::Result,
            value: "1-0",
        },
        PhraseEntry {
            phrases: &["black win", "black wins", "black victory"],
            field: FilterField::Result,
            value: "0-1",
        },
        PhraseEntry {
            phrases: &["draw", "drawn", "drew"],
            field: FilterField::Result,
            value: "1/2-1/2",
        },
    ]
});

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    let padded_phrase = format!(" {phrase} ");
    padded.contains(&padded_phrase)
}

/// Detect every metadata and result filter present in `cleaned_text`
/// (spec.md §4.1 steps 4-5). `cleaned_text` must already be normalized
/// (single-spaced, lowercase, no punctuation).
#[must_use]
pub fn detect_filters(cleaned_text: &str) -> Vec<Filter> {
    let padded = format!(" {cleaned_text} ");
    let mut filters = Vec::new();

    for entry in OPENINGS.iter() {
        if entry.phrases.iter().any(|p| contains_phrase(&padded, p)) {
            filters.push(Filter::new(FilterField::Opening, entry.slug));
            filters.push(Filter::new(FilterField::EcoRange, entry.eco_range));
            break;
        }
    }

    for table in [&*THEMES, &*PHASES, &*RESULTS] {
        for entry in table.iter() {
            if entry.phrases.iter().any(|p| contains_phrase(&padded, p)) {
                filters.push(Filter::new(entry.field, entry.value));
            }
        }
    }

    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_opening_and_eco_range_together() {
        let filters = detect_filters("games featuring the sicilian defense");
        assert!(filters.contains(&Filter::new(FilterField::Opening, "sicilian_defense")));
        assert!(filters.contains(&Filter::new(FilterField::EcoRange, "B20-B99")));
    }

    #[test]
    fn prefers_more_specific_opening_phrase() {
        let filters = detect_filters("ruy lopez endgame with sacrifice");
        assert!(filters.contains(&Filter::new(FilterField::Opening, "ruy_lopez")));
        assert!(filters.contains(&Filter::new(FilterField::Phase, "endgame")));
        assert!(filters.contains(&Filter::new(FilterField::Theme, "sacrifice")));
    }

    #[test]
    fn detects_result_phrases() {
        assert!(detect_filters("show white win games")
            .contains(&Filter::new(FilterField::Result, "1-0")));
        assert!(detect_filters("black victory combinations")
            .contains(&Filter::new(FilterField::Result, "0-1")));
        assert!(detect_filters("endgame that was drawn")
            .contains(&Filter::new(FilterField::Result, "1/2-1/2")));
    }

    #[test]
    fn plain_text_yields_no_filters() {
        assert!(detect_filters("magnus carlsen best games").is_empty());
    }
}
