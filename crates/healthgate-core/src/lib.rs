//! healthgate-core — configuration shared by the Healthgate crates.
//!
//! A `healthgate.toml` file declares the probes to run against an
//! environment and the two retry tiers that decide when the environment
//! counts as reliably healthy. This crate only models and validates that
//! file; the engine lives in `healthgate-health` and the concrete probes
//! in `healthgate-probes`.

pub mod config;
pub mod duration;
pub mod error;

pub use config::{
    Backoff, EvaluationConfig, HealthgateConfig, HttpConfig, ProbeConfig, ProbeTarget,
    RetryConfig,
};
pub use duration::{format_duration, parse_duration};
pub use error::{ConfigError, ConfigResult};
