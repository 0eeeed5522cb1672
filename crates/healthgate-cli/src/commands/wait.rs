//! `healthgate await` — the full attempt/assurance evaluation.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use healthgate_core::{HealthgateConfig, RetryConfig};
use healthgate_health::{EvaluationSettings, HealthError, TracingReporter};
use tracing::info;

use crate::Overrides;
use crate::output::print_outcome;

pub async fn run(config_path: &Path, format: &str, overrides: &Overrides) -> anyhow::Result<()> {
    let mut config = HealthgateConfig::from_file(config_path)?;
    apply_overrides(&mut config, overrides);
    config.validate()?;

    let settings = EvaluationSettings::from_config(&config)?;
    let checker =
        healthgate_probes::build_checker(&config)?.with_reporter(Arc::new(TracingReporter));
    info!(
        probes = checker.len(),
        attempts = settings.attempts.attempts(),
        assurance = settings.assurance.attempts(),
        verbose = settings.verbose,
        "awaiting healthy environment"
    );

    match checker.evaluate(&settings).await {
        Ok(outcome) => {
            print_outcome(&outcome, format)?;
            if !outcome.is_healthy() {
                bail!(
                    "health checking stopped with {} probe(s) failing",
                    outcome.failed().count()
                );
            }
            Ok(())
        }
        Err(e) => {
            if let Some(outcome) = e.outcome() {
                print_outcome(outcome, format)?;
            }
            match e {
                HealthError::EvaluationFailed { ratio, .. } => {
                    bail!("health checking failed, success ratio {ratio}")
                }
                other => Err(other.into()),
            }
        }
    }
}

/// Layer command-line flags over the `[evaluation]` section.
fn apply_overrides(config: &mut HealthgateConfig, overrides: &Overrides) {
    let eval = &mut config.evaluation;

    if overrides.attempts.is_some() || overrides.delay.is_some() {
        let retry = eval.retry.get_or_insert_with(RetryConfig::default);
        if let Some(attempts) = overrides.attempts {
            retry.attempts = Some(attempts);
        }
        if let Some(delay) = &overrides.delay {
            retry.delay = Some(delay.clone());
        }
    }
    if overrides.assurance_attempts.is_some() || overrides.assurance_delay.is_some() {
        let assurance = eval.assurance.get_or_insert_with(RetryConfig::default);
        if let Some(attempts) = overrides.assurance_attempts {
            assurance.attempts = Some(attempts);
        }
        if let Some(delay) = &overrides.assurance_delay {
            assurance.delay = Some(delay.clone());
        }
    }
    if let Some(wait) = &overrides.wait_before {
        eval.wait_before = Some(wait.clone());
    }
    if let Some(wait) = &overrides.wait_after {
        eval.wait_after = Some(wait.clone());
    }
    if overrides.permissive {
        eval.verbose = Some(false);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut config = HealthgateConfig::parse(
            r#"
[evaluation.retry]
attempts = 10
delay = "2s"
"#,
        )
        .unwrap();

        let overrides = Overrides {
            attempts: Some(3),
            assurance_delay: Some("250ms".to_string()),
            wait_after: Some("1m".to_string()),
            permissive: true,
            ..Overrides::default()
        };
        apply_overrides(&mut config, &overrides);
        config.validate().unwrap();

        let settings = EvaluationSettings::from_config(&config).unwrap();
        assert_eq!(settings.attempts.attempts(), 3);
        // Untouched value survives.
        assert_eq!(settings.attempts.delay(1), Duration::from_secs(2));
        assert_eq!(settings.assurance.attempts(), 2);
        assert_eq!(settings.assurance.delay(1), Duration::from_millis(250));
        assert_eq!(settings.wait_after, Duration::from_secs(60));
        assert!(!settings.verbose);
    }

    #[test]
    fn no_overrides_keeps_config() {
        let mut config = HealthgateConfig::scaffold();
        apply_overrides(&mut config, &Overrides::default());
        assert_eq!(config, HealthgateConfig::scaffold());
    }

    #[test]
    fn invalid_override_is_caught_by_validation() {
        let mut config = HealthgateConfig::default();
        let overrides = Overrides {
            attempts: Some(0),
            ..Overrides::default()
        };
        apply_overrides(&mut config, &overrides);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn await_with_no_probes_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthgate.toml");
        std::fs::write(&path, "[evaluation]\nwait_before = \"1m\"\n").unwrap();

        run(&path, "text", &Overrides::default()).await.unwrap();
    }
}
