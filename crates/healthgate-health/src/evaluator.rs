//! Evaluation state machine — drives the attempt and assurance tiers.
//!
//! The evaluator repeatedly runs a [`ParallelRound`] over every registered
//! probe. A failing round is retried under the attempt policy; a clean
//! round counts toward the assurance policy, which demands that many clean
//! rounds in a row before the environment is declared healthy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use healthgate_core::HealthgateConfig;
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::error::{HealthError, HealthResult};
use crate::outcome::EvaluationOutcome;
use crate::policy::RetryPolicy;
use crate::probe::{FnProbe, Probe};
use crate::reporter::{ProgressUpdate, Reporter};
use crate::round::ParallelRound;

const STEP: &str = "Health checking";

/// Knobs for one evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    /// Bounds the retries of a failing round.
    pub attempts: RetryPolicy,
    /// Number of consecutive clean rounds required.
    pub assurance: RetryPolicy,
    pub wait_before: Duration,
    pub wait_after: Duration,
    /// Raise on attempt exhaustion instead of only logging it.
    pub verbose: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            attempts: RetryPolicy::default_attempts(),
            assurance: RetryPolicy::default_assurance(),
            wait_before: Duration::ZERO,
            wait_after: Duration::ZERO,
            verbose: true,
        }
    }
}

impl EvaluationSettings {
    /// Read the `[evaluation]` section, falling back to the defaults.
    pub fn from_config(config: &HealthgateConfig) -> HealthResult<Self> {
        Ok(Self {
            attempts: RetryPolicy::from_config(&config.retry())?,
            assurance: RetryPolicy::from_config(&config.assurance())?,
            wait_before: config.wait_before()?,
            wait_after: config.wait_after()?,
            verbose: config.verbose(),
        })
    }

    /// One round, no retries, no assurance, never raises.
    pub fn single_round() -> Self {
        Self {
            attempts: RetryPolicy::once(),
            assurance: RetryPolicy::once(),
            wait_before: Duration::ZERO,
            wait_after: Duration::ZERO,
            verbose: false,
        }
    }
}

/// Where an [`Evaluation`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPhase {
    /// Initial grace period before the first round.
    WaitBefore,
    /// About to run round attempt N (1-based) of the attempt tier.
    RoundAttempt { attempt: u32 },
    /// The last round was clean; assurance bookkeeping pending.
    RoundSucceeded,
    /// The attempt tier ran out with probes still failing.
    AttemptsExceeded,
    /// Grace period after the final round.
    WaitAfter,
    /// Finished; the outcome is available.
    Done,
    /// Finished with a terminal failure (verbose mode only).
    Failed,
}

/// Registry of probes plus the collaborators an evaluation needs.
pub struct HealthChecker {
    probes: Vec<Arc<dyn Probe>>,
    clock: Arc<dyn Clock>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            clock: Arc::new(TokioClock),
            reporter: None,
        }
    }

    /// Replace the sleep primitive (e.g. with a `RecordingClock` in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Register a closure as a probe.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, op: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.register_probe(Arc::new(FnProbe::new(name, op)))
    }

    pub fn register_probe(&mut self, probe: Arc<dyn Probe>) -> &mut Self {
        if probe.name().trim().is_empty() {
            warn!("registering probe with an empty name");
        }
        self.probes.push(probe);
        self
    }

    pub fn probes(&self) -> &[Arc<dyn Probe>] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run the full attempt/assurance protocol.
    ///
    /// With no probes registered this returns an empty outcome at once,
    /// without waiting.
    pub async fn evaluate(&self, settings: &EvaluationSettings) -> HealthResult<EvaluationOutcome> {
        if self.probes.is_empty() {
            info!("health checking skipped as no probes defined");
            if let Some(reporter) = &self.reporter {
                reporter.info("Health checking skipped as no probes defined.");
            }
            return Ok(EvaluationOutcome::default());
        }

        Evaluation::new(
            &self.probes,
            settings,
            self.clock.as_ref(),
            self.reporter.as_deref(),
        )
        .run()
        .await
    }
}

/// A single evaluation in progress.
///
/// Owns the round counters and the latest outcome; nothing here is shared
/// with the probe tasks.
pub struct Evaluation<'a> {
    probes: &'a [Arc<dyn Probe>],
    settings: &'a EvaluationSettings,
    clock: &'a dyn Clock,
    reporter: Option<&'a dyn Reporter>,
    phase: EvaluationPhase,
    /// 1-based index of the clean round being worked toward.
    assurance_no: u32,
    rounds: u32,
    outcome: EvaluationOutcome,
}

impl<'a> Evaluation<'a> {
    pub fn new(
        probes: &'a [Arc<dyn Probe>],
        settings: &'a EvaluationSettings,
        clock: &'a dyn Clock,
        reporter: Option<&'a dyn Reporter>,
    ) -> Self {
        Self {
            probes,
            settings,
            clock,
            reporter,
            phase: EvaluationPhase::WaitBefore,
            assurance_no: 1,
            rounds: 0,
            outcome: EvaluationOutcome::default(),
        }
    }

    pub fn phase(&self) -> EvaluationPhase {
        self.phase
    }

    /// Rounds executed so far, across both tiers.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn assurance_no(&self) -> u32 {
        self.assurance_no
    }

    pub fn outcome(&self) -> &EvaluationOutcome {
        &self.outcome
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, EvaluationPhase::Done | EvaluationPhase::Failed)
    }

    /// Drive the machine to completion.
    pub async fn run(mut self) -> HealthResult<EvaluationOutcome> {
        while !self.is_finished() {
            self.step().await;
        }
        self.finish()
    }

    /// Execute the current phase and transition to the next.
    ///
    /// Calling this on a finished evaluation does nothing.
    pub async fn step(&mut self) {
        let next = match self.phase {
            EvaluationPhase::WaitBefore => self.wait_before().await,
            EvaluationPhase::RoundAttempt { attempt } => self.round_attempt(attempt).await,
            EvaluationPhase::RoundSucceeded => self.round_succeeded().await,
            EvaluationPhase::AttemptsExceeded => self.attempts_exceeded(),
            EvaluationPhase::WaitAfter => self.wait_after().await,
            EvaluationPhase::Done | EvaluationPhase::Failed => return,
        };
        debug!(from = ?self.phase, to = ?next, "evaluation phase change");
        self.phase = next;
    }

    /// Consume a finished evaluation and produce its result.
    pub fn finish(self) -> HealthResult<EvaluationOutcome> {
        if self.phase == EvaluationPhase::Failed {
            return Err(HealthError::EvaluationFailed {
                ratio: self.outcome.pass_ratio(),
                report: self.outcome.report(),
                outcome: Box::new(self.outcome),
            });
        }
        Ok(self.outcome)
    }

    async fn wait_before(&mut self) -> EvaluationPhase {
        self.progress("Wait before".to_string());
        if !self.settings.wait_before.is_zero() {
            self.clock.sleep(self.settings.wait_before).await;
        }
        self.assurance_no = 1;
        EvaluationPhase::RoundAttempt { attempt: 1 }
    }

    async fn round_attempt(&mut self, attempt: u32) -> EvaluationPhase {
        let max = self.settings.attempts.attempts();
        let message = if self.outcome.is_healthy() {
            format!("Attempt {attempt}/{max}")
        } else {
            let ratio = self.outcome.pass_ratio();
            format!(
                "Attempt {attempt}/{max}, check(s) succeeded {}/{}",
                ratio.passed, ratio.total
            )
        };
        self.progress(message);

        self.outcome = EvaluationOutcome::new(ParallelRound::run(self.probes).await);
        self.rounds += 1;

        if self.outcome.is_healthy() {
            return EvaluationPhase::RoundSucceeded;
        }

        // Any failure restarts the run of consecutive clean rounds.
        self.assurance_no = 1;
        debug!(
            attempt,
            max,
            failed = self.outcome.failed().count(),
            "round failed"
        );
        if self.settings.verbose {
            self.info(&self.outcome.failure_report());
        }

        if attempt < max {
            self.clock.sleep(self.settings.attempts.delay(attempt)).await;
            EvaluationPhase::RoundAttempt {
                attempt: attempt + 1,
            }
        } else {
            EvaluationPhase::AttemptsExceeded
        }
    }

    async fn round_succeeded(&mut self) -> EvaluationPhase {
        let required = self.settings.assurance.attempts();
        self.info(&format!(
            "Health checking passed ({}/{required})",
            self.assurance_no
        ));

        if self.assurance_no < required {
            self.clock
                .sleep(self.settings.assurance.delay(self.assurance_no))
                .await;
            self.assurance_no += 1;
            EvaluationPhase::RoundAttempt { attempt: 1 }
        } else {
            EvaluationPhase::WaitAfter
        }
    }

    fn attempts_exceeded(&mut self) -> EvaluationPhase {
        let message = format!(
            "Health checking failed. Success ratio: {}:\n{}",
            self.outcome.pass_ratio(),
            self.outcome.report()
        );
        warn!(
            rounds = self.rounds,
            attempts = self.settings.attempts.attempts(),
            "health check attempts exceeded"
        );
        if let Some(reporter) = self.reporter {
            reporter.error(&message);
        }

        if self.settings.verbose {
            EvaluationPhase::Failed
        } else {
            EvaluationPhase::WaitAfter
        }
    }

    async fn wait_after(&mut self) -> EvaluationPhase {
        self.progress("Wait after".to_string());
        if !self.settings.wait_after.is_zero() {
            self.clock.sleep(self.settings.wait_after).await;
        }

        let summary = if self.outcome.is_healthy() {
            format!("Health checking succeeded.\n{}", self.outcome.report())
        } else {
            format!(
                "Health checking stopped with failing probes. Success ratio: {}:\n{}",
                self.outcome.pass_ratio(),
                self.outcome.report()
            )
        };
        info!(
            rounds = self.rounds,
            healthy = self.outcome.is_healthy(),
            "health checking finished"
        );
        if let Some(reporter) = self.reporter {
            reporter.summary(&summary);
        }
        EvaluationPhase::Done
    }

    fn progress(&self, message: String) {
        if let Some(reporter) = self.reporter {
            reporter.progress(&ProgressUpdate {
                step: STEP.to_string(),
                message,
                count: self.assurance_no,
                total: self.settings.assurance.attempts(),
            });
        }
    }

    fn info(&self, message: &str) {
        if let Some(reporter) = self.reporter {
            reporter.info(message);
        }
    }
}
