use crate::error::{HybridError, Result};
use crate::fusion;
use chessmate_agent::{AgentEvaluator, Candidate};
use chessmate_agentcache::{cache_key, AgentCache};
use chessmate_breaker::CircuitBreaker;
use chessmate_protocol::{
    sanitize, AgentEvaluation, AgentStatus, ExecutionOutput, GameSummary, QueryPlan, RankedResult, VectorHit,
};
use chessmate_vector::{build_payload_filter, GameRepository, PgnFetcher, QueryVectorStrategy, VectorSearchClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tunables named in spec.md §4.6/§4.7; defaults match the spec's
/// stated values.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// SQL/agent over-fetch multiplier applied to `plan.limit` (default 5).
    pub candidate_multiplier: usize,
    /// Ceiling on the SQL over-fetch limit, independent of the agent's
    /// own per-call candidate cap — without this a large `plan.limit`
    /// times `candidate_multiplier` could ask the repository for an
    /// unbounded page. Defaults to `chessmate_protocol::MAX_LIMIT`.
    pub sql_overfetch_cap: usize,
    /// Floor/multiplier for the vector-store query limit (spec.md §4.6
    /// step 2: `max(plan.limit × 3, 15)`).
    pub vector_search_multiplier: usize,
    pub vector_search_min_limit: usize,
    /// Ceiling on how many candidates are sent to the agent evaluator in
    /// one call (spec.md §4.5 `candidate_max`, default 25).
    pub agent_candidate_max: usize,
    pub agent_request_timeout: Option<Duration>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            candidate_multiplier: 5,
            sql_overfetch_cap: chessmate_protocol::MAX_LIMIT,
            vector_search_multiplier: 3,
            vector_search_min_limit: 15,
            agent_candidate_max: chessmate_agent::DEFAULT_CANDIDATE_MAX,
            agent_request_timeout: Some(Duration::from_secs(15)),
        }
    }
}

/// Optional agent-stage collaborators (spec.md §4.6 step 4): all three
/// must be present, plus a PGN fetcher, for the agent stage to run at
/// all. Bundled together since they are only ever wired up as a unit.
pub struct AgentStage {
    pub evaluator: Arc<dyn AgentEvaluator>,
    pub cache: Option<Arc<dyn AgentCache>>,
    pub breaker: Arc<CircuitBreaker>,
    pub pgns: Arc<dyn PgnFetcher>,
}

/// Coordinates the SQL fetch, vector search, score fusion, and (when
/// configured) agent re-ranking stage (spec.md §4.6). Generic over the
/// capability traits from `chessmate-vector`/`chessmate-agent`/
/// `chessmate-agentcache`/`chessmate-breaker` via trait objects, per
/// spec.md §9 "Polymorphism".
pub struct HybridExecutor {
    config: HybridConfig,
    games: Arc<dyn GameRepository>,
    vectors: Arc<dyn VectorSearchClient>,
    query_vector: Arc<dyn QueryVectorStrategy>,
    agent: Option<AgentStage>,
}

impl HybridExecutor {
    #[must_use]
    pub fn new(
        config: HybridConfig,
        games: Arc<dyn GameRepository>,
        vectors: Arc<dyn VectorSearchClient>,
        query_vector: Arc<dyn QueryVectorStrategy>,
    ) -> Self {
        Self {
            config,
            games,
            vectors,
            query_vector,
            agent: None,
        }
    }

    #[must_use]
    pub fn with_agent_stage(mut self, agent: AgentStage) -> Self {
        self.agent = Some(agent);
        self
    }

    /// spec.md §4.6 `execute(plan) -> {results, total, has_more, warnings,
    /// agent_status}`. Only a SQL failure aborts the request (spec.md
    /// §7); every other collaborator failure degrades into a warning.
    pub async fn execute(&self, plan: &QueryPlan, question: &str) -> Result<ExecutionOutput> {
        let sql_limit = compute_sql_limit(plan, &self.config);

        let games_fut = self.games.fetch_games(&plan.filters, &plan.rating, sql_limit, plan.offset);
        let vector_fut = self.compute_vector_hits(plan, question);
        let (games_result, vector_result) = tokio::join!(games_fut, vector_fut);

        let (summaries, total) = games_result.map_err(|err| HybridError::Sql(sanitize(&err.to_string())))?;

        let mut warnings = Vec::new();
        let hits_by_game = match vector_result {
            Ok((hits, maybe_warning)) => {
                if let Some(warning) = maybe_warning {
                    warnings.push(warning);
                }
                merge_hits(hits)
            }
            Err(message) => {
                warnings.push(message);
                HashMap::new()
            }
        };

        let candidate_window = self
            .config
            .agent_candidate_max
            .min(plan.limit.max(plan.limit.saturating_mul(self.config.candidate_multiplier)));

        let (agent_status, eval_map) = self
            .run_agent_stage(plan, question, &summaries, candidate_window, &mut warnings)
            .await;

        let mut results: Vec<RankedResult> = summaries
            .iter()
            .map(|summary| score_candidate(summary, plan, hits_by_game.get(&summary.id), eval_map.get(&summary.id)))
            .collect();

        results.sort_by(|a, b| b.total_score.partial_cmp(&a.total_score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(plan.limit);

        let has_more = ExecutionOutput::compute_has_more(total, plan.offset, results.len());

        Ok(ExecutionOutput {
            plan: plan.clone(),
            results,
            total,
            has_more,
            warnings,
            agent_status,
        })
    }

    async fn compute_vector_hits(
        &self,
        plan: &QueryPlan,
        question: &str,
    ) -> std::result::Result<(Vec<VectorHit>, Option<String>), String> {
        let outcome = self.query_vector.compute(question).await;
        let warning = outcome.warning().map(str::to_string);
        let vector = outcome.vector().to_vec();
        let payload = build_payload_filter(plan);
        let limit = (plan.limit * self.config.vector_search_multiplier).max(self.config.vector_search_min_limit);

        match self.vectors.fetch_vector_hits(&vector, &payload, limit).await {
            Ok(hits) => Ok((hits, warning)),
            Err(err) => Err(sanitize(&format!("vector search failed: {err}"))),
        }
    }

    /// spec.md §4.6 step 4. Runs only when an [`AgentStage`] is wired up
    /// and the breaker currently allows a call. PGNs are fetched for the
    /// whole candidate window up front (the cache key is keyed on the
    /// PGN, so there is no way to probe the cache without it first), then
    /// the cache is probed per candidate and only misses go to the
    /// evaluator.
    async fn run_agent_stage(
        &self,
        plan: &QueryPlan,
        question: &str,
        summaries: &[GameSummary],
        window: usize,
        warnings: &mut Vec<String>,
    ) -> (AgentStatus, HashMap<i64, AgentEvaluation>) {
        let Some(stage) = &self.agent else {
            return (AgentStatus::Disabled, HashMap::new());
        };

        if !stage.breaker.should_allow() {
            warnings.push("agent evaluation skipped: circuit breaker open".to_string());
            return (AgentStatus::CircuitOpen, HashMap::new());
        }

        let window_summaries: Vec<&GameSummary> = summaries.iter().take(window).collect();
        if window_summaries.is_empty() {
            return (AgentStatus::Enabled, HashMap::new());
        }

        let game_ids: Vec<i64> = window_summaries.iter().map(|s| s.id).collect();
        let pgns = match stage.pgns.fetch_pgns(&game_ids).await {
            Ok(pgns) => pgns,
            Err(err) => {
                stage.breaker.record_failure();
                warnings.push(sanitize(&format!("agent evaluation failed: could not fetch PGNs ({err})")));
                return (AgentStatus::Enabled, HashMap::new());
            }
        };

        let mut eval_map = HashMap::new();
        let mut misses: Vec<(GameSummary, String, String)> = Vec::new();

        for summary in window_summaries.iter().copied() {
            let pgn = pgns.get(&summary.id).cloned().unwrap_or_default();
            let key = cache_key(plan, summary, &pgn);
            if let Some(cache) = &stage.cache {
                if let Some(cached) = cache.find(&key).await {
                    eval_map.insert(summary.id, cached);
                    continue;
                }
            }
            misses.push((summary.clone(), pgn, key));
        }

        if misses.is_empty() {
            return (AgentStatus::Enabled, eval_map);
        }

        let candidates: Vec<Candidate> = misses
            .iter()
            .map(|(summary, pgn, _)| Candidate {
                summary: summary.clone(),
                pgn: pgn.clone(),
            })
            .collect();

        match stage
            .evaluator
            .evaluate(plan, question, &candidates, self.config.agent_request_timeout)
            .await
        {
            Ok(batch) => {
                stage.breaker.record_success();
                for evaluation in batch.evaluations {
                    if let Some(cache) = &stage.cache {
                        if let Some((_, _, key)) = misses.iter().find(|(s, _, _)| s.id == evaluation.game_id) {
                            cache.store(key, evaluation.clone()).await;
                        }
                    }
                    eval_map.insert(evaluation.game_id, evaluation);
                }
                (AgentStatus::Enabled, eval_map)
            }
            Err(err) => {
                stage.breaker.record_failure();
                warnings.push(sanitize(&format!("agent evaluation failed: {err}")));
                (AgentStatus::Enabled, eval_map)
            }
        }
    }
}

fn compute_sql_limit(plan: &QueryPlan, config: &HybridConfig) -> usize {
    plan.limit
        .saturating_mul(config.candidate_multiplier)
        .min(config.sql_overfetch_cap)
        .max(plan.limit)
}

fn merge_hits(hits: Vec<VectorHit>) -> HashMap<i64, VectorHit> {
    let mut merged: HashMap<i64, VectorHit> = HashMap::new();
    for hit in hits {
        merged
            .entry(hit.game_id)
            .and_modify(|existing| existing.merge(hit.clone()))
            .or_insert(hit);
    }
    merged
}

fn score_candidate(
    summary: &GameSummary,
    plan: &QueryPlan,
    hit: Option<&VectorHit>,
    agent_eval: Option<&AgentEvaluation>,
) -> RankedResult {
    let rating_ok = fusion::rating_matches(summary, &plan.rating);
    let matched_filters = fusion::count_matched_filters(summary, &plan.filters);

    let mut summary_tokens = fusion::tokenize_summary(summary);
    if let Some(hit) = hit {
        for keyword in &hit.keywords {
            if !summary_tokens.contains(keyword) {
                summary_tokens.push(keyword.clone());
            }
        }
    }

    let vector_score = fusion::vector_score(hit.map(|h| h.score), rating_ok, matched_filters, plan.filters.len());
    let keyword_score = fusion::keyword_score(&plan.keywords, &summary_tokens);
    let base = fusion::base_total(vector_score, keyword_score);
    let agent_score = agent_eval.map(|e| e.clamped_score());
    let total_score = fusion::combine_with_agent(base, agent_score);

    RankedResult {
        summary: summary.clone(),
        total_score,
        vector_score,
        keyword_score,
        agent_score,
        agent_explanation: agent_eval.and_then(|e| e.explanation.clone()),
        agent_themes: agent_eval.map(|e| e.themes.clone()).unwrap_or_default(),
        agent_reasoning_effort: agent_eval.map(|e| e.reasoning_effort.clone()),
        agent_usage: agent_eval.and_then(|e| e.usage),
        phases: hit.map(|h| h.phases.clone()).unwrap_or_default(),
        themes: hit.map(|h| h.themes.clone()).unwrap_or_default(),
        keywords: summary_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessmate_agent::{Candidate, EvaluationBatch, TelemetryEvent};
    use chessmate_agentcache::InMemoryAgentCache;
    use chessmate_protocol::{AgentUsage, Filter, FilterField, Rating};
    use chessmate_vector::{hash_fallback_vector, InMemoryGameRepository, InMemoryVectorSearchClient, QueryVectorOutcome};
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn summary(id: i64, opening_slug: &str) -> GameSummary {
        GameSummary {
            id,
            white: "Alpha".into(),
            black: "Beta".into(),
            white_rating: Some(2500),
            black_rating: Some(2400),
            event: Some("Test Open".into()),
            played_on: None,
            result: Some("1-0".into()),
            eco_code: Some("B30".into()),
            opening_slug: Some(opening_slug.into()),
            opening_name: Some("Sicilian Defense".into()),
        }
    }

    fn plan(limit: usize) -> QueryPlan {
        QueryPlan::new(
            "sicilian defense games".into(),
            vec!["sicilian".into(), "defense".into()],
            vec![Filter::new(FilterField::Opening, "sicilian_defense")],
            Rating::default(),
            limit,
            0,
        )
    }

    struct InMemoryQueryVector {
        dimension: usize,
    }

    #[async_trait::async_trait]
    impl QueryVectorStrategy for InMemoryQueryVector {
        async fn compute(&self, text: &str) -> QueryVectorOutcome {
            QueryVectorOutcome::Embedded(hash_fallback_vector(text, self.dimension))
        }
    }

    #[tokio::test]
    async fn execute_without_agent_returns_disabled_status() {
        let games = vec![summary(1, "sicilian_defense"), summary(2, "french_defense")];
        let hits = vec![VectorHit {
            game_id: 1,
            score: 0.9,
            phases: vec!["middlegame".into()],
            themes: vec!["tactics".into()],
            keywords: vec![],
        }];

        let strategy: Arc<dyn QueryVectorStrategy> = Arc::new(InMemoryQueryVector { dimension: 8 });
        let executor = HybridExecutor::new(
            HybridConfig::default(),
            Arc::new(InMemoryGameRepository::new(games)),
            Arc::new(InMemoryVectorSearchClient::new(hits)),
            strategy,
        );

        let plan = plan(10);
        let output = executor.execute(&plan, "sicilian defense games").await.unwrap();

        assert_eq!(output.agent_status, AgentStatus::Disabled);
        assert!(!output.results.is_empty());
        assert_eq!(output.results[0].summary.id, 1);
        assert!(output.results[0].total_score >= output.results[1].total_score);
    }

    #[tokio::test]
    async fn vector_search_failure_degrades_to_warning_not_error() {
        let games = vec![summary(1, "sicilian_defense")];

        struct FailingVectorClient;
        #[async_trait::async_trait]
        impl VectorSearchClient for FailingVectorClient {
            async fn fetch_vector_hits(
                &self,
                _vector: &[f32],
                _filter: &chessmate_vector::PayloadFilter,
                _limit: usize,
            ) -> chessmate_vector::Result<Vec<VectorHit>> {
                Err(chessmate_vector::VectorError::VectorStore("connection refused".into()))
            }
        }

        let strategy: Arc<dyn QueryVectorStrategy> = Arc::new(InMemoryQueryVector { dimension: 8 });
        let executor = HybridExecutor::new(
            HybridConfig::default(),
            Arc::new(InMemoryGameRepository::new(games)),
            Arc::new(FailingVectorClient),
            strategy,
        );

        let plan = plan(10);
        let output = executor.execute(&plan, "sicilian defense games").await.unwrap();
        assert!(!output.warnings.is_empty());
        assert_eq!(output.results.len(), 1);
    }

    struct FakeEvaluator;

    #[async_trait::async_trait]
    impl AgentEvaluator for FakeEvaluator {
        async fn evaluate(
            &self,
            _plan: &QueryPlan,
            _question: &str,
            candidates: &[Candidate],
            _timeout: Option<Duration>,
        ) -> chessmate_agent::Result<EvaluationBatch> {
            Ok(EvaluationBatch {
                evaluations: candidates
                    .iter()
                    .map(|c| AgentEvaluation {
                        game_id: c.summary.id,
                        score: 0.9,
                        explanation: Some("sharp tactical line".into()),
                        themes: vec!["sacrifice".into()],
                        reasoning_effort: "low".into(),
                        usage: None,
                    })
                    .collect(),
                telemetry: TelemetryEvent {
                    event: "agent_evaluation",
                    timestamp_ms: 0,
                    question_truncated: "sicilian defense games".into(),
                    candidate_count: candidates.len(),
                    evaluated: candidates.len(),
                    reasoning_effort: "low".into(),
                    latency_ms: 0,
                    tokens: AgentUsage {
                        input_tokens: 0,
                        output_tokens: 0,
                        reasoning_tokens: 0,
                    },
                    cost: None,
                },
            })
        }
    }

    #[tokio::test]
    async fn execute_with_agent_stage_folds_in_agent_score() {
        let games = vec![summary(1, "sicilian_defense")];
        let pgns = std::collections::HashMap::from([(1, "1.e4 c5".to_string())]);

        let stage = AgentStage {
            evaluator: Arc::new(FakeEvaluator),
            cache: Some(Arc::new(InMemoryAgentCache::new(NonZeroUsize::new(16).unwrap()))),
            breaker: Arc::new(CircuitBreaker::new(3, Duration::from_secs(30))),
            pgns: Arc::new(chessmate_vector::InMemoryPgnFetcher::new(pgns)),
        };

        let strategy: Arc<dyn QueryVectorStrategy> = Arc::new(InMemoryQueryVector { dimension: 8 });
        let executor = HybridExecutor::new(
            HybridConfig::default(),
            Arc::new(InMemoryGameRepository::new(games)),
            Arc::new(InMemoryVectorSearchClient::new(vec![])),
            strategy,
        )
        .with_agent_stage(stage);

        let plan = plan(10);
        let output = executor.execute(&plan, "sicilian defense games").await.unwrap();

        assert_eq!(output.agent_status, AgentStatus::Enabled);
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].agent_score, Some(0.9));
    }

    #[tokio::test]
    async fn execute_with_open_breaker_skips_agent_stage() {
        let games = vec![summary(1, "sicilian_defense")];
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();

        let stage = AgentStage {
            evaluator: Arc::new(FakeEvaluator),
            cache: None,
            breaker: Arc::new(breaker),
            pgns: Arc::new(chessmate_vector::InMemoryPgnFetcher::default()),
        };

        let strategy: Arc<dyn QueryVectorStrategy> = Arc::new(InMemoryQueryVector { dimension: 8 });
        let executor = HybridExecutor::new(
            HybridConfig::default(),
            Arc::new(InMemoryGameRepository::new(games)),
            Arc::new(InMemoryVectorSearchClient::new(vec![])),
            strategy,
        )
        .with_agent_stage(stage);

        let plan = plan(10);
        let output = executor.execute(&plan, "sicilian defense games").await.unwrap();

        assert_eq!(output.agent_status, AgentStatus::CircuitOpen);
        assert!(output.warnings.iter().any(|w| w.contains("circuit breaker")));
        assert!(output.results[0].agent_score.is_none());
    }
}
