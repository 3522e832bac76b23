use async_trait::async_trait;
use chessmate_protocol::sanitize;
use serde::Serialize;
use std::time::{Duration, Instant};

/// One dependency probe result (spec.md §6 "Health endpoint").
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Ok,
    Error(String),
    Skipped,
}

/// A single external dependency the `/health` endpoint polls: `postgres`
/// and `qdrant` are required (their failure is fatal to overall status);
/// `redis` and `openai` are optional (their failure only degrades),
/// mirroring `crates/indexer/src/health.rs`'s snapshot-of-checks shape,
/// generalized from one process's internal gauges to a list of named
/// external probes.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn required(&self) -> bool;
    async fn check(&self) -> CheckOutcome;
}

pub struct PgHealthCheck {
    pool: sqlx::PgPool,
}

impl PgHealthCheck {
    #[must_use]
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgHealthCheck {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn required(&self) -> bool {
        true
    }

    async fn check(&self) -> CheckOutcome {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => CheckOutcome::Ok,
            Err(err) => CheckOutcome::Error(sanitize(&err.to_string())),
        }
    }
}

/// A bare HTTP reachability probe, used for Qdrant, Redis (via its own
/// HTTP-exposed health route if configured), and the OpenAI-compatible
/// agent/embedding endpoints.
pub struct HttpHealthCheck {
    name: &'static str,
    required: bool,
    url: String,
    client: reqwest::Client,
}

impl HttpHealthCheck {
    #[must_use]
    pub fn new(name: &'static str, url: impl Into<String>, required: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_default();
        Self {
            name,
            required,
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    fn required(&self) -> bool {
        self.required
    }

    async fn check(&self) -> CheckOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => CheckOutcome::Ok,
            Ok(response) => CheckOutcome::Error(format!("status {}", response.status())),
            Err(err) => CheckOutcome::Error(sanitize(&err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckReport {
    pub name: String,
    pub status: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: Status,
    pub checks: Vec<CheckReport>,
}

impl HealthReport {
    #[must_use]
    pub fn http_status(&self) -> u16 {
        if self.status == Status::Ok {
            200
        } else {
            503
        }
    }
}

/// Runs every registered check and folds the verdicts into an overall
/// status: any required check failing is `error`; an optional check
/// failing (with all required checks passing) is `degraded`.
pub async fn run_checks(checks: &[Box<dyn HealthCheck>]) -> HealthReport {
    let mut reports = Vec::with_capacity(checks.len());
    let mut any_required_failed = false;
    let mut any_optional_failed = false;

    for check in checks {
        let started = Instant::now();
        let outcome = check.check().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (status, detail) = match outcome {
            CheckOutcome::Ok => ("ok", None),
            CheckOutcome::Skipped => ("skipped", None),
            CheckOutcome::Error(message) => {
                if check.required() {
                    any_required_failed = true;
                } else {
                    any_optional_failed = true;
                }
                ("error", Some(message))
            }
        };

        reports.push(CheckReport {
            name: check.name().to_string(),
            status,
            required: check.required(),
            latency_ms: Some(latency_ms),
            detail,
        });
    }

    let status = if any_required_failed {
        Status::Error
    } else if any_optional_failed {
        Status::Degraded
    } else {
        Status::Ok
    };

    HealthReport { status, checks: reports }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCheck {
        name: &'static str,
        required: bool,
        outcome: CheckOutcome,
    }

    #[async_trait]
    impl HealthCheck for FixedCheck {
        fn name(&self) -> &'static str {
            self.name
        }
        fn required(&self) -> bool {
            self.required
        }
        async fn check(&self) -> CheckOutcome {
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn all_ok_checks_yield_ok_status() {
        let checks: Vec<Box<dyn HealthCheck>> = vec![Box::new(FixedCheck {
            name: "postgres",
            required: true,
            outcome: CheckOutcome::Ok,
        })];
        let report = run_checks(&checks).await;
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.http_status(), 200);
    }

    #[tokio::test]
    async fn failing_optional_check_degrades_but_does_not_error() {
        let checks: Vec<Box<dyn HealthCheck>> = vec![
            Box::new(FixedCheck {
                name: "postgres",
                required: true,
                outcome: CheckOutcome::Ok,
            }),
            Box::new(FixedCheck {
                name: "redis",
                required: false,
                outcome: CheckOutcome::Error("connection refused".into()),
            }),
        ];
        let report = run_checks(&checks).await;
        assert_eq!(report.status, Status::Degraded);
        assert_eq!(report.http_status(), 503);
    }

    #[tokio::test]
    async fn failing_required_check_yields_error_status() {
        let checks: Vec<Box<dyn HealthCheck>> = vec![Box::new(FixedCheck {
            name: "postgres",
            required: true,
            outcome: CheckOutcome::Error("timeout".into()),
        })];
        let report = run_checks(&checks).await;
        assert_eq!(report.status, Status::Error);
    }
}
