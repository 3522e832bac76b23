use crate::error::{AgentError, Result};
use chessmate_protocol::AgentEvaluation;
use serde::Deserialize;

#[derive(Deserialize)]
struct RawEvaluation {
    game_id: Option<i64>,
    score: Option<f32>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    themes: Vec<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    evaluations: Vec<RawEvaluation>,
}

/// Parse the model's JSON body into evaluations (spec.md §4.5 "Response
/// parsing"). Entries missing `game_id` or `score` are dropped rather
/// than failing the whole batch; the batch itself fails only if nothing
/// usable survives.
pub fn parse_response(body: &str, reasoning_effort: &str) -> Result<Vec<AgentEvaluation>> {
    let raw: RawResponse =
        serde_json::from_str(body).map_err(|err| AgentError::Schema(err.to_string()))?;

    let evaluations: Vec<AgentEvaluation> = raw
        .evaluations
        .into_iter()
        .filter_map(|entry| {
            let game_id = entry.game_id?;
            let score = entry.score?;
            let mut themes = entry.themes;
            themes.sort_unstable();
            themes.dedup();
            Some(AgentEvaluation {
                game_id,
                score: score.clamp(0.0, 1.0),
                explanation: entry.explanation,
                themes,
                reasoning_effort: reasoning_effort.to_string(),
                usage: None,
            })
        })
        .collect();

    if evaluations.is_empty() {
        return Err(AgentError::Empty);
    }

    Ok(evaluations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_entries_and_clamps_score() {
        let body = r#"{"evaluations":[{"game_id":1,"score":1.5,"themes":["b","a","a"]}]}"#;
        let evals = parse_response(body, "medium").unwrap();
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].score, 1.0);
        assert_eq!(evals[0].themes, vec!["a", "b"]);
    }

    #[test]
    fn drops_entries_missing_required_fields() {
        let body = r#"{"evaluations":[{"game_id":1},{"score":0.4},{"game_id":2,"score":0.8}]}"#;
        let evals = parse_response(body, "low").unwrap();
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].game_id, 2);
    }

    #[test]
    fn empty_evaluation_list_is_an_error() {
        let body = r#"{"evaluations":[]}"#;
        assert!(matches!(parse_response(body, "low"), Err(AgentError::Empty)));
    }

    #[test]
    fn malformed_json_is_a_schema_error() {
        assert!(matches!(
            parse_response("not json", "low"),
            Err(AgentError::Schema(_))
        ));
    }
}
