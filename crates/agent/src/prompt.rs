use chessmate_protocol::{FilterField, GameSummary, QueryPlan};

/// Default cap on how many candidates are sent to the model in one call
/// (spec.md §4.5 "Inputs").
pub const DEFAULT_CANDIDATE_MAX: usize = 25;

const PGN_TRUNCATE_CHARS: usize = 3000;
const ELLIPSIS_MARKER: &str = "...[truncated]";

pub struct Candidate {
    pub summary: GameSummary,
    pub pgn: String,
}

pub const SYSTEM_MESSAGE: &str =
    "You are a chess analyst. Score each candidate game on how well it answers the question. \
     Respond only with the requested JSON.";

/// `high` if any theme filter is present or there are >=4 keywords,
/// else `medium` (spec.md §4.5 "Reasoning-effort heuristic").
#[must_use]
pub fn reasoning_effort(plan: &QueryPlan) -> &'static str {
    let has_theme = plan.filters.iter().any(|f| f.field == FilterField::Theme);
    if has_theme || plan.keywords.len() >= 4 {
        "high"
    } else {
        "medium"
    }
}

/// `low` if <=1 filter and <=2 keywords, else `medium` (spec.md §4.5
/// "Verbosity heuristic").
#[must_use]
pub fn verbosity(plan: &QueryPlan) -> &'static str {
    if plan.filters.len() <= 1 && plan.keywords.len() <= 2 {
        "low"
    } else {
        "medium"
    }
}

fn truncate_pgn(pgn: &str) -> String {
    if pgn.chars().count() <= PGN_TRUNCATE_CHARS {
        return pgn.to_string();
    }
    let truncated: String = pgn.chars().take(PGN_TRUNCATE_CHARS).collect();
    format!("{truncated}{ELLIPSIS_MARKER}")
}

fn candidate_block(candidate: &Candidate) -> String {
    let s = &candidate.summary;
    format!(
        "game_id={id} white={white} black={black} result={result} opening={opening} date={date} \
         white_rating={white_rating} black_rating={black_rating}\n{pgn}",
        id = s.id,
        white = s.white,
        black = s.black,
        result = s.result.as_deref().unwrap_or("?"),
        opening = s.opening_name.as_deref().unwrap_or("?"),
        date = s.played_on.as_deref().unwrap_or("?"),
        white_rating = s
            .white_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".into()),
        black_rating = s
            .black_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".into()),
        pgn = truncate_pgn(&candidate.pgn),
    )
}

/// Build the user message: instruction, the original question, and a
/// serialized block per candidate (spec.md §4.5 "User message").
#[must_use]
pub fn user_message(question: &str, candidates: &[Candidate]) -> String {
    let mut out = format!(
        "Question: {question}\n\nScore each of the following {count} candidate games from 0 to 1 \
         on relevance to the question. Return JSON matching the schema exactly.\n\n",
        count = candidates.len()
    );
    for candidate in candidates {
        out.push_str(&candidate_block(candidate));
        out.push_str("\n---\n");
    }
    out
}

/// JSON schema the response must conform to (spec.md §4.5 "Response
/// format").
#[must_use]
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "evaluations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "game_id": {"type": "integer"},
                        "score": {"type": "number"},
                        "explanation": {"type": "string"},
                        "themes": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["game_id", "score"]
                }
            }
        },
        "required": ["evaluations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessmate_protocol::{Filter, Rating};

    fn plan_with(filters: Vec<Filter>, keyword_count: usize) -> QueryPlan {
        QueryPlan::new(
            "x".into(),
            (0..keyword_count).map(|i| format!("k{i}")).collect(),
            filters,
            Rating::default(),
            50,
            0,
        )
    }

    #[test]
    fn reasoning_effort_is_high_with_theme_filter() {
        let plan = plan_with(vec![Filter::new(FilterField::Theme, "sacrifice")], 0);
        assert_eq!(reasoning_effort(&plan), "high");
    }

    #[test]
    fn reasoning_effort_is_high_with_many_keywords() {
        let plan = plan_with(vec![], 4);
        assert_eq!(reasoning_effort(&plan), "high");
    }

    #[test]
    fn reasoning_effort_is_medium_otherwise() {
        let plan = plan_with(vec![], 1);
        assert_eq!(reasoning_effort(&plan), "medium");
    }

    #[test]
    fn verbosity_is_low_for_sparse_plans() {
        let plan = plan_with(vec![Filter::new(FilterField::Phase, "endgame")], 2);
        assert_eq!(verbosity(&plan), "low");
    }

    #[test]
    fn verbosity_is_medium_for_richer_plans() {
        let plan = plan_with(vec![Filter::new(FilterField::Phase, "endgame")], 3);
        assert_eq!(verbosity(&plan), "medium");
    }

    #[test]
    fn pgn_over_limit_is_truncated_with_marker() {
        let long_pgn = "1.e4 e5 ".repeat(500);
        let truncated = truncate_pgn(&long_pgn);
        assert!(truncated.ends_with(ELLIPSIS_MARKER));
        assert!(truncated.len() < long_pgn.len());
    }
}
