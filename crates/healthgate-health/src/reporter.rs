//! Progress and log sink for evaluations.

use serde::Serialize;
use tracing::{error, info};

/// A progress update emitted on every phase change and attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub step: String,
    pub message: String,
    /// Current assurance round.
    pub count: u32,
    /// Assurance rounds required.
    pub total: u32,
}

/// Receives progress and log output from an evaluation.
///
/// Implementations must not block for long; they are called inline from
/// the evaluation loop.
pub trait Reporter: Send + Sync {
    fn progress(&self, update: &ProgressUpdate);

    fn info(&self, message: &str);

    fn error(&self, message: &str);

    /// Final report once the evaluation has finished.
    fn summary(&self, summary: &str);
}

/// Writes everything through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn progress(&self, update: &ProgressUpdate) {
        info!(
            step = %update.step,
            count = update.count,
            total = update.total,
            "{}",
            update.message
        );
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn summary(&self, summary: &str) {
        info!("{summary}");
    }
}
