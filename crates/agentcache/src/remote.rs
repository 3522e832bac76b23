use crate::{AgentCache, Result};
use async_trait::async_trait;
use chessmate_protocol::AgentEvaluation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Simple request/response KV backend (spec.md §4.4 "Remote KV").
/// Connection failures are logged and degrade to a cache miss; they
/// never propagate to the caller, since the agent cache is a pure
/// optimization and the query must still succeed without it.
pub struct RemoteAgentCache {
    client: reqwest::Client,
    base_url: String,
    namespace: Option<String>,
    ttl: Option<Duration>,
}

impl RemoteAgentCache {
    #[must_use]
    pub fn new(base_url: impl Into<String>, namespace: Option<String>, ttl: Option<Duration>) -> Self {
        Self::with_timeout(base_url, namespace, ttl, DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(
        base_url: impl Into<String>,
        namespace: Option<String>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            namespace,
            ttl,
        }
    }

    fn namespaced(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key.to_string(),
        }
    }
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    value: &'a AgentEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_secs: Option<u64>,
}

#[derive(Deserialize)]
struct FindResponse {
    value: AgentEvaluation,
}

#[async_trait]
impl AgentCache for RemoteAgentCache {
    async fn find(&self, key: &str) -> Option<AgentEvaluation> {
        let url = format!("{}/cache/{}", self.base_url, self.namespaced(key));
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<FindResponse>()
                .await
                .map(|body| body.value)
                .map_err(|err| log::warn!("agent cache response malformed: {err}"))
                .ok(),
            Ok(resp) if resp.status().as_u16() == 404 => None,
            Ok(resp) => {
                log::warn!("agent cache find returned status {}", resp.status());
                None
            }
            Err(err) => {
                log::warn!("agent cache unreachable, treating as a miss: {err}");
                None
            }
        }
    }

    async fn store(&self, key: &str, entry: AgentEvaluation) {
        let url = format!("{}/cache/{}", self.base_url, self.namespaced(key));
        let body = StoreRequest {
            value: &entry,
            ttl_secs: self.ttl.map(|d| d.as_secs()),
        };
        if let Err(err) = self.client.put(&url).json(&body).send().await {
            log::warn!("agent cache store failed, continuing without it: {err}");
        }
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| crate::error::AgentCacheError::Unreachable(err.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(crate::error::AgentCacheError::UnexpectedStatus(
                resp.status().as_u16(),
            ))
        }
    }
}
