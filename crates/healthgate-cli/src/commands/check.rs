use std::path::Path;

use anyhow::bail;
use healthgate_core::HealthgateConfig;
use healthgate_health::EvaluationSettings;

use crate::output::print_outcome;

/// One round, no retries. Fails when any probe fails.
pub async fn run(config_path: &Path, format: &str) -> anyhow::Result<()> {
    let config = HealthgateConfig::from_file(config_path)?;
    let checker = healthgate_probes::build_checker(&config)?;

    let outcome = checker.evaluate(&EvaluationSettings::single_round()).await?;
    print_outcome(&outcome, format)?;

    if !outcome.is_healthy() {
        bail!("{} probe(s) failing", outcome.failed().count());
    }
    Ok(())
}
