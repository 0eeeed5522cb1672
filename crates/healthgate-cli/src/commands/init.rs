use std::path::Path;

use anyhow::bail;
use healthgate_core::HealthgateConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let output = path.join("healthgate.toml");
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let config = HealthgateConfig::scaffold();
    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
