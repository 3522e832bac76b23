use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chessmate_protocol::{sanitize, AgentStatus, AgentUsage, ExecutionOutput, QueryPlan, QueryRequest, RankedResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub question: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ResultView {
    pub game_id: i64,
    pub white: String,
    pub black: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco: Option<String>,
    pub phases: Vec<String>,
    pub themes: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_elo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_elo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    pub score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_explanation: Option<String>,
    pub agent_themes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_usage: Option<AgentUsage>,
}

fn derive_year(played_on: Option<&str>) -> Option<String> {
    let played_on = played_on?;
    let year = played_on.get(0..4)?;
    year.chars().all(|c| c.is_ascii_digit()).then(|| year.to_string())
}

/// `synopsis` has no source field in spec.md §3's `GameSummary`; it is a
/// short derived description (players, opening, result) rather than a
/// passthrough, the same way the teacher's report formatters compose a
/// one-line summary from several columns.
fn synopsis(result: &RankedResult) -> Option<String> {
    let summary = &result.summary;
    let mut parts = vec![format!("{} vs {}", summary.white, summary.black)];
    if let Some(opening) = &summary.opening_name {
        parts.push(opening.clone());
    }
    if let Some(outcome) = &summary.result {
        parts.push(outcome.clone());
    }
    Some(parts.join(" \u{2014} "))
}

fn to_result_view(result: RankedResult) -> ResultView {
    let year = derive_year(result.summary.played_on.as_deref());
    let synopsis = synopsis(&result);
    ResultView {
        game_id: result.summary.id,
        white: result.summary.white,
        black: result.summary.black,
        result: result.summary.result,
        year,
        event: result.summary.event,
        opening_slug: result.summary.opening_slug,
        opening_name: result.summary.opening_name,
        eco: result.summary.eco_code,
        phases: result.phases,
        themes: result.themes,
        keywords: result.keywords,
        white_elo: result.summary.white_rating,
        black_elo: result.summary.black_rating,
        synopsis,
        score: result.total_score,
        vector_score: result.vector_score,
        keyword_score: result.keyword_score,
        agent_score: result.agent_score,
        agent_explanation: result.agent_explanation,
        agent_themes: result.agent_themes,
        agent_reasoning_effort: result.agent_reasoning_effort,
        agent_usage: result.agent_usage,
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub plan: QueryPlan,
    pub summary: String,
    pub results: Vec<ResultView>,
    pub total: usize,
    pub offset: usize,
    pub has_more: bool,
    pub agent_status: AgentStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn build_response(question: String, output: ExecutionOutput) -> QueryResponse {
    let summary = format!(
        "{} of {} result(s) for \"{}\"",
        output.results.len(),
        output.total,
        question
    );
    QueryResponse {
        question,
        offset: output.plan.offset,
        plan: output.plan,
        summary,
        results: output.results.into_iter().map(to_result_view).collect(),
        total: output.total,
        has_more: output.has_more,
        agent_status: output.agent_status,
        warnings: output.warnings,
    }
}

fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| addr.ip().to_string())
}

async fn run_query(state: &Arc<AppState>, request: QueryRequest, question: String, client: &str, body_bytes: u64) -> Result<Response> {
    let route = "/query";
    let started = Instant::now();

    if body_bytes > state.max_request_body_bytes {
        state.metrics.record_request(route, 413, started.elapsed().as_secs_f64());
        return Err(ServerError::BodyTooLarge);
    }

    let decision = state.limiter.check(client, Some(body_bytes));
    state.metrics.record_rate_limit(decision.is_allowed(), client);
    if let chessmate_ratelimit::Decision::Limited { retry_after, .. } = decision {
        let retry_after_secs = retry_after.as_secs().max(1);
        state.metrics.record_request(route, 429, started.elapsed().as_secs_f64());
        return Err(ServerError::RateLimited { retry_after_secs });
    }

    if question.trim().is_empty() {
        state.metrics.record_request(route, 400, started.elapsed().as_secs_f64());
        return Err(ServerError::MissingQuestion);
    }

    let plan = chessmate_intent::analyse(&request);

    let output = state
        .hybrid
        .execute(&plan, &question)
        .await
        .map_err(|err| ServerError::Internal(sanitize(&err.to_string())))?;

    state.metrics.record_request(route, 200, started.elapsed().as_secs_f64());
    Ok(Json(build_response(question, output)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct GetQueryParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

pub async fn get_query(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<GetQueryParams>,
) -> Response {
    let question = params.q.unwrap_or_default();
    let client = client_key(&headers, addr);
    let request = QueryRequest {
        text: question.clone(),
        limit: params.limit,
        offset: params.offset,
    };

    match run_query(&state, request, question, &client, 0).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub async fn post_query(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let client = client_key(&headers, addr);
    let body_len = body.len() as u64;

    if body_len > state.max_request_body_bytes {
        return ServerError::BodyTooLarge.into_response();
    }

    let parsed: QueryBody = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(_) => return ServerError::MissingQuestion.into_response(),
    };

    let question = parsed.question.clone();
    let request = QueryRequest {
        text: question.clone(),
        limit: parsed.limit,
        offset: parsed.offset,
    };

    match run_query(&state, request, question, &client, body_len).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
