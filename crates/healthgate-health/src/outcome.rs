//! Round results and their aggregates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeStatus;

/// Statuses from the most recent round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub statuses: Vec<ProbeStatus>,
}

impl EvaluationOutcome {
    pub fn new(statuses: Vec<ProbeStatus>) -> Self {
        Self { statuses }
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// True when no probe failed. An empty outcome counts as healthy.
    pub fn is_healthy(&self) -> bool {
        self.statuses.iter().all(ProbeStatus::is_success)
    }

    pub fn passed(&self) -> impl Iterator<Item = &ProbeStatus> {
        self.statuses.iter().filter(|s| s.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProbeStatus> {
        self.statuses.iter().filter(|s| !s.is_success())
    }

    pub fn pass_ratio(&self) -> PassRatio {
        PassRatio {
            passed: self.passed().count(),
            total: self.statuses.len(),
        }
    }

    /// Statuses ordered failed-first, then by probe name.
    pub fn sorted(&self) -> Vec<&ProbeStatus> {
        let mut sorted: Vec<_> = self.statuses.iter().collect();
        sorted.sort_by(|a, b| {
            a.is_success()
                .cmp(&b.is_success())
                .then_with(|| a.name.cmp(&b.name))
        });
        sorted
    }

    /// One line per status, in [`sorted`](Self::sorted) order.
    pub fn report(&self) -> String {
        join_lines(self.sorted())
    }

    /// Only the failing statuses, sorted by name.
    pub fn failure_report(&self) -> String {
        let mut failed: Vec<_> = self.failed().collect();
        failed.sort_by(|a, b| a.name.cmp(&b.name));
        join_lines(failed)
    }
}

fn join_lines(statuses: Vec<&ProbeStatus>) -> String {
    statuses
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `passed / total`, displayed as `3/4 (75.00%)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRatio {
    pub passed: usize,
    pub total: usize,
}

impl PassRatio {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for PassRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.2}%)", self.passed, self.total, self.percent())
    }
}
