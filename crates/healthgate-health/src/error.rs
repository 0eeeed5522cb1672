//! Evaluation error types.

use thiserror::Error;

use crate::outcome::{EvaluationOutcome, PassRatio};

/// Result type alias for evaluation operations.
pub type HealthResult<T> = Result<T, HealthError>;

/// Errors raised by the evaluation engine.
///
/// Individual probe failures never show up here; they are folded into
/// [`ProbeStatus`](crate::ProbeStatus) values at the round boundary.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The attempt tier ran out with probes still failing, in verbose mode.
    #[error("Health checking failed. Success ratio: {ratio}:\n{report}")]
    EvaluationFailed {
        ratio: PassRatio,
        report: String,
        /// The last round's statuses, for callers that want to inspect them.
        outcome: Box<EvaluationOutcome>,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] healthgate_core::ConfigError),
}

impl HealthError {
    /// The outcome that caused the failure, if the error carries one.
    pub fn outcome(&self) -> Option<&EvaluationOutcome> {
        match self {
            HealthError::EvaluationFailed { outcome, .. } => Some(outcome.as_ref()),
            HealthError::Config(_) => None,
        }
    }
}
