//! healthgate-health — decides whether an environment is reliably healthy.
//!
//! Runs a set of caller-supplied probes in parallel rounds and applies a
//! two-tier retry protocol to the results.
//!
//! # Architecture
//!
//! ```text
//! HealthChecker (probe registry)
//!   └── evaluate(settings) → Evaluation state machine
//!         ├── ParallelRound::run(probes) → Vec<ProbeStatus>
//!         ├── attempt tier   (RetryPolicy: retry a failing round)
//!         ├── assurance tier (RetryPolicy: consecutive clean rounds)
//!         ├── Clock          (sleeps, fake in tests)
//!         └── Reporter       (progress + log lines, optional)
//! ```
//!
//! # Assurance
//!
//! A single clean round is not enough: the assurance tier requires
//! `assurance.attempts` clean rounds in a row. Any failing round resets
//! that progress, so the attempt tier has to win a full clean round again
//! before assurance resumes.
//!
//! Exhausting the attempt tier ends the whole evaluation. In verbose mode
//! that raises [`HealthError::EvaluationFailed`]; otherwise it is logged
//! and the failing outcome is returned.

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod outcome;
pub mod policy;
pub mod probe;
pub mod reporter;
pub mod round;

pub use clock::{Clock, RecordingClock, TokioClock};
pub use error::{HealthError, HealthResult};
pub use evaluator::{Evaluation, EvaluationPhase, EvaluationSettings, HealthChecker};
pub use outcome::{EvaluationOutcome, PassRatio};
pub use policy::{Delay, RetryPolicy};
pub use probe::{FnProbe, Probe, ProbeOutcome, ProbeStatus};
pub use reporter::{ProgressUpdate, Reporter, TracingReporter};
pub use round::ParallelRound;
