use chessmate_protocol::AgentUsage;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

const QUESTION_TRUNCATE_CHARS: usize = 200;

/// Per-1K-token prices used to derive the optional `cost` block
/// (spec.md §4.5 "Telemetry").
#[derive(Debug, Clone, Copy)]
pub struct CostRates {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub reasoning_per_1k: f64,
}

#[derive(Serialize)]
pub struct CostBreakdown {
    pub input: f64,
    pub output: f64,
    pub reasoning: f64,
    pub total: f64,
}

#[derive(Serialize)]
pub struct TelemetryEvent {
    pub event: &'static str,
    pub timestamp_ms: u64,
    pub question_truncated: String,
    pub candidate_count: usize,
    pub evaluated: usize,
    pub reasoning_effort: String,
    pub latency_ms: u64,
    pub tokens: AgentUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostBreakdown>,
}

fn truncate_question(question: &str) -> String {
    if question.chars().count() <= QUESTION_TRUNCATE_CHARS {
        return question.to_string();
    }
    question.chars().take(QUESTION_TRUNCATE_CHARS).collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[must_use]
pub fn cost_breakdown(usage: &AgentUsage, rates: &CostRates) -> CostBreakdown {
    let input = (usage.input_tokens as f64 / 1000.0) * rates.input_per_1k;
    let output = (usage.output_tokens as f64 / 1000.0) * rates.output_per_1k;
    let reasoning = (usage.reasoning_tokens as f64 / 1000.0) * rates.reasoning_per_1k;
    CostBreakdown {
        input,
        output,
        reasoning,
        total: input + output + reasoning,
    }
}

#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn build_event(
    question: &str,
    candidate_count: usize,
    evaluated: usize,
    reasoning_effort: &str,
    latency_ms: u64,
    tokens: AgentUsage,
    rates: Option<&CostRates>,
) -> TelemetryEvent {
    TelemetryEvent {
        event: "agent_evaluation",
        timestamp_ms: now_ms(),
        question_truncated: truncate_question(question),
        candidate_count,
        evaluated,
        reasoning_effort: reasoning_effort.to_string(),
        latency_ms,
        cost: rates.map(|r| cost_breakdown(&tokens, r)),
        tokens,
    }
}

/// Emit the telemetry event as a single structured log line.
pub fn emit(event: &TelemetryEvent) {
    match serde_json::to_string(event) {
        Ok(line) => log::info!("{line}"),
        Err(err) => log::warn!("failed to serialize agent telemetry event: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_questions() {
        let question = "x".repeat(400);
        let truncated = truncate_question(&question);
        assert_eq!(truncated.chars().count(), QUESTION_TRUNCATE_CHARS);
    }

    #[test]
    fn cost_breakdown_sums_components() {
        let usage = AgentUsage {
            input_tokens: 2000,
            output_tokens: 1000,
            reasoning_tokens: 500,
        };
        let rates = CostRates {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
            reasoning_per_1k: 0.06,
        };
        let cost = cost_breakdown(&usage, &rates);
        assert!((cost.total - (0.02 + 0.03 + 0.03)).abs() < 1e-9);
    }
}
