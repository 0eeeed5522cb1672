//! Retry policies for the attempt and assurance tiers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use healthgate_core::config::{
    DEFAULT_ASSURANCE_ATTEMPTS, DEFAULT_ASSURANCE_DELAY, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_DELAY,
};
use healthgate_core::{Backoff, ConfigResult, RetryConfig};

/// Delay to apply after a given attempt.
///
/// Every variant is a pure function of the attempt index, so two runs with
/// the same policy sleep for exactly the same durations.
#[derive(Clone)]
pub enum Delay {
    /// Same delay after every attempt.
    Constant(Duration),
    /// `step * attempt`.
    Linear { step: Duration },
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
    /// Caller-supplied function of the attempt index.
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl Delay {
    /// Delay after attempt `attempt` (1-based).
    pub fn after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Delay::Constant(d) => *d,
            Delay::Linear { step } => step.saturating_mul(attempt),
            Delay::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(*max)
            }
            Delay::Custom(f) => f(attempt),
        }
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Constant(d) => f.debug_tuple("Constant").field(d).finish(),
            Delay::Linear { step } => f.debug_struct("Linear").field("step", step).finish(),
            Delay::Exponential { base, max } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("max", max)
                .finish(),
            Delay::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How many times to try, and how long to wait in between.
///
/// The last attempt never sleeps afterward, so `delay` is only consulted
/// for indices `1..attempts`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Delay,
}

impl RetryPolicy {
    /// Build a policy. `attempts` below 1 is raised to 1.
    pub fn new(attempts: u32, delay: Delay) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn constant(attempts: u32, delay: Duration) -> Self {
        Self::new(attempts, Delay::Constant(delay))
    }

    /// A single attempt, no delay.
    pub fn once() -> Self {
        Self::constant(1, Duration::ZERO)
    }

    /// Attempt tier default: 60 attempts, 5s apart.
    pub fn default_attempts() -> Self {
        Self::constant(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    /// Assurance tier default: 2 clean rounds, 1s apart.
    pub fn default_assurance() -> Self {
        Self::constant(DEFAULT_ASSURANCE_ATTEMPTS, DEFAULT_ASSURANCE_DELAY)
    }

    /// Build from a `[evaluation.retry]` / `[evaluation.assurance]` table.
    pub fn from_config(config: &RetryConfig) -> ConfigResult<Self> {
        let delay = config.delay()?;
        let delay = match config.backoff() {
            Backoff::Constant => Delay::Constant(delay),
            Backoff::Linear => Delay::Linear { step: delay },
            Backoff::Exponential => Delay::Exponential {
                base: delay,
                max: config.max_delay()?.unwrap_or(Duration::MAX),
            },
        };
        Ok(Self::new(config.attempts(), delay))
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay.after(attempt)
    }

    /// Total time spent sleeping if every attempt is used.
    pub fn total_delay(&self) -> Duration {
        (1..self.attempts).fold(Duration::ZERO, |acc, n| acc.saturating_add(self.delay(n)))
    }
}
