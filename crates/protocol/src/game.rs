use serde::{Deserialize, Serialize};

/// External projection of a game row (spec.md §3). Identity is `id`; all
/// other fields are optional because relational metadata may be sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: i64,
    pub white: String,
    pub black: String,
    #[serde(default)]
    pub white_rating: Option<u32>,
    #[serde(default)]
    pub black_rating: Option<u32>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub played_on: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub eco_code: Option<String>,
    #[serde(default)]
    pub opening_slug: Option<String>,
    #[serde(default)]
    pub opening_name: Option<String>,
}

/// A single point returned by the vector store before per-game merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub game_id: i64,
    pub score: f32,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl VectorHit {
    /// Merge another hit for the same game: max score, union of metadata
    /// (case-folded, sorted, deduplicated) per spec.md §4.6 step 3.
    pub fn merge(&mut self, other: VectorHit) {
        debug_assert_eq!(self.game_id, other.game_id);
        if other.score > self.score {
            self.score = other.score;
        }
        merge_sorted_unique(&mut self.phases, other.phases);
        merge_sorted_unique(&mut self.themes, other.themes);
        merge_sorted_unique(&mut self.keywords, other.keywords);
    }
}

fn merge_sorted_unique(into: &mut Vec<String>, from: Vec<String>) {
    for item in from {
        into.push(item.to_ascii_lowercase());
    }
    into.sort_unstable();
    into.dedup();
}

/// LLM-produced re-ranking score for a single candidate (spec.md §3/§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvaluation {
    pub game_id: i64,
    pub score: f32,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    pub reasoning_effort: String,
    #[serde(default)]
    pub usage: Option<AgentUsage>,
}

impl AgentEvaluation {
    /// Clamp score to `[0,1]` per spec.md §4.5 response parsing rule.
    #[must_use]
    pub fn clamped_score(&self) -> f32 {
        self.score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub reasoning_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_vector_hits_taking_max_score_and_union_metadata() {
        let mut a = VectorHit {
            game_id: 1,
            score: 0.4,
            phases: vec!["Endgame".into()],
            themes: vec!["Sacrifice".into()],
            keywords: vec![],
        };
        let b = VectorHit {
            game_id: 1,
            score: 0.8,
            phases: vec!["endgame".into(), "middlegame".into()],
            themes: vec![],
            keywords: vec!["fork".into()],
        };
        a.merge(b);
        assert_eq!(a.score, 0.8);
        assert_eq!(a.phases, vec!["endgame", "middlegame"]);
        assert_eq!(a.themes, vec!["sacrifice"]);
        assert_eq!(a.keywords, vec!["fork"]);
    }
}
