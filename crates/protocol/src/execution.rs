use crate::game::{AgentUsage, GameSummary};
use crate::plan::QueryPlan;
use serde::{Deserialize, Serialize};

/// Whether the agent re-ranking stage ran for this query. A tagged sum,
/// not a boolean, per spec.md §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Disabled,
    Enabled,
    CircuitOpen,
}

/// A single scored, ranked candidate in the response (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub summary: GameSummary,
    pub total_score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    #[serde(default)]
    pub agent_score: Option<f32>,
    #[serde(default)]
    pub agent_explanation: Option<String>,
    #[serde(default)]
    pub agent_themes: Vec<String>,
    /// Present only when the agent stage actually scored this result
    /// (spec.md §6 response shape `agent_reasoning_effort`).
    #[serde(default)]
    pub agent_reasoning_effort: Option<String>,
    #[serde(default)]
    pub agent_usage: Option<AgentUsage>,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Full response body for a successful query (spec.md §3/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub plan: QueryPlan,
    pub results: Vec<RankedResult>,
    pub total: usize,
    pub has_more: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub agent_status: AgentStatus,
}

impl ExecutionOutput {
    /// `has_more` per spec.md §4.6 step 7: more rows exist beyond what
    /// was already offset-and-limited by the SQL fetch.
    #[must_use]
    pub fn compute_has_more(total: usize, offset: usize, returned: usize) -> bool {
        total > offset + returned
    }
}
