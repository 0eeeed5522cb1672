//! Probe model.
//!
//! A probe is a named check with a single async operation. Concrete
//! probes (HTTP, TCP, custom closures) all sit behind the [`Probe`] trait.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A named unit of health verification.
///
/// `run` returns a short description of what was observed on success, or
/// an error describing the failure. Probes are re-run on every attempt,
/// so they should be idempotent.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Display name used in reports.
    fn name(&self) -> &str;

    /// Perform the check once.
    async fn run(&self) -> anyhow::Result<String>;
}

/// Adapts a closure returning a future into a [`Probe`].
pub struct FnProbe<F> {
    name: String,
    op: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, op: F) -> Self {
        Self {
            name: name.into(),
            op,
        }
    }
}

impl<F> fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProbe").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<String> {
        (self.op)().await
    }
}

/// Result of running one probe once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Succeeded { detail: String },
    Failed { detail: String },
}

impl ProbeOutcome {
    /// Fold a probe's `Result` into an outcome. Errors keep their whole
    /// context chain.
    pub fn from_result(result: anyhow::Result<String>) -> Self {
        match result {
            Ok(detail) => ProbeOutcome::Succeeded { detail },
            Err(e) => ProbeOutcome::Failed {
                detail: format!("{e:#}"),
            },
        }
    }
}

/// Status of one probe in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ProbeStatus {
    pub fn succeeded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ProbeOutcome::Succeeded {
                detail: detail.into(),
            },
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ProbeOutcome::Failed {
                detail: detail.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Succeeded { .. })
    }

    pub fn detail(&self) -> &str {
        match &self.outcome {
            ProbeOutcome::Succeeded { detail } | ProbeOutcome::Failed { detail } => detail,
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_success() { "ok" } else { "failed" };
        write!(f, "[{mark}] {}: {}", self.name, self.detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_probe_runs_closure() {
        let probe = FnProbe::new("echo", || async { Ok("pong".to_string()) });
        assert_eq!(probe.name(), "echo");
        assert_eq!(probe.run().await.unwrap(), "pong");
    }

    #[test]
    fn outcome_from_error_keeps_context() {
        let err = anyhow::anyhow!("connection refused").context("GET http://svc/healthz");
        let outcome = ProbeOutcome::from_result(Err(err));
        assert_eq!(
            outcome,
            ProbeOutcome::Failed {
                detail: "GET http://svc/healthz: connection refused".to_string()
            }
        );
    }

    #[test]
    fn status_display() {
        let ok = ProbeStatus::succeeded("api", "GET / -> 200 OK");
        assert!(ok.is_success());
        assert_eq!(ok.to_string(), "[ok] api: GET / -> 200 OK");

        let bad = ProbeStatus::failed("db", "refused");
        assert!(!bad.is_success());
        assert_eq!(bad.detail(), "refused");
        assert_eq!(bad.to_string(), "[failed] db: refused");
    }

    #[test]
    fn status_serializes_flat() {
        let json = serde_json::to_value(ProbeStatus::failed("db", "refused")).unwrap();
        assert_eq!(json["name"], "db");
        assert_eq!(json["result"], "failed");
        assert_eq!(json["detail"], "refused");
    }
}
