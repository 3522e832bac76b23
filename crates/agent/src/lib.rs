//! # Chessmate Agent Evaluator
//!
//! Sends a bounded batch of candidates to an LLM for relevance scoring
//! (spec.md §4.5). Prompt construction, response parsing, and telemetry
//! are plain functions; [`HttpAgentEvaluator`] is the one piece that
//! touches the network, modeled on
//! `examples/elisplash-paw/src-tauri/src/engine/providers/openai.rs`'s
//! message formatting and `engine/http.rs`'s retry/backoff discipline.

mod backoff;
mod error;
mod parse;
mod prompt;
mod telemetry;

pub use error::{AgentError, Result};
pub use prompt::{Candidate, DEFAULT_CANDIDATE_MAX};
pub use telemetry::{CostRates, TelemetryEvent};

use async_trait::async_trait;
use chessmate_protocol::{AgentEvaluation, AgentUsage, QueryPlan};
use serde::Deserialize;
use std::time::{Duration, Instant};

pub struct EvaluationBatch {
    pub evaluations: Vec<AgentEvaluation>,
    pub telemetry: TelemetryEvent,
}

/// The evaluator's sole contract: score candidates against a plan/
/// question. Any failure reason in spec.md §4.5 ("Failure") surfaces as
/// an [`AgentError`]; the caller (the hybrid executor) is responsible
/// for recording it against the circuit breaker.
#[async_trait]
pub trait AgentEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        plan: &QueryPlan,
        question: &str,
        candidates: &[Candidate],
        timeout: Option<Duration>,
    ) -> Result<EvaluationBatch>;
}

const DEFAULT_MAX_RETRIES: u32 = 2;

pub struct HttpAgentEvaluator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    cost_rates: Option<CostRates>,
}

impl HttpAgentEvaluator {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            cost_rates: None,
        }
    }

    #[must_use]
    pub fn with_cost_rates(mut self, rates: CostRates) -> Self {
        self.cost_rates = Some(rates);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn call_once(&self, body: &serde_json::Value) -> Result<(String, AgentUsage)> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut last_error = AgentError::Transport("no attempt made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff::backoff_delay(attempt - 1)).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = AgentError::Transport(err.to_string());
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let status_code = status.as_u16();
                let text = response.text().await.unwrap_or_default();
                last_error = AgentError::Status(status_code, text);
                if backoff::is_retryable_status(status_code) && attempt < self.max_retries {
                    continue;
                }
                return Err(last_error);
            }

            let text = response
                .text()
                .await
                .map_err(|err| AgentError::Transport(err.to_string()))?;
            let usage = extract_usage(&text);
            return Ok((text, usage));
        }

        Err(last_error)
    }
}

#[derive(Deserialize, Default)]
struct UsageWire {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    reasoning_tokens: u32,
}

#[derive(Deserialize)]
struct ResponseWire {
    #[serde(default)]
    usage: Option<UsageWire>,
}

fn extract_usage(body: &str) -> AgentUsage {
    let wire: ResponseWire = serde_json::from_str(body).unwrap_or(ResponseWire { usage: None });
    let usage = wire.usage.unwrap_or_default();
    AgentUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        reasoning_tokens: usage.reasoning_tokens,
    }
}

#[async_trait]
impl AgentEvaluator for HttpAgentEvaluator {
    async fn evaluate(
        &self,
        plan: &QueryPlan,
        question: &str,
        candidates: &[Candidate],
        timeout: Option<Duration>,
    ) -> Result<EvaluationBatch> {
        let effort = prompt::reasoning_effort(plan);
        let verbosity = prompt::verbosity(plan);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt::SYSTEM_MESSAGE},
                {"role": "user", "content": prompt::user_message(question, candidates)},
            ],
            "reasoning_effort": effort,
            "verbosity": verbosity,
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "evaluations", "schema": prompt::response_schema()},
            },
        });

        let start = Instant::now();
        let call = self.call_once(&body);

        let (text, usage) = match timeout {
            Some(dur) => tokio::time::timeout(dur, call)
                .await
                .map_err(|_| AgentError::Timeout(dur))??,
            None => call.await?,
        };

        let evaluations = parse::parse_response(&text, effort)?;
        let telemetry = telemetry::build_event(
            question,
            candidates.len(),
            evaluations.len(),
            effort,
            start.elapsed().as_millis() as u64,
            usage,
            self.cost_rates.as_ref(),
        );

        Ok(EvaluationBatch {
            evaluations,
            telemetry,
        })
    }
}
