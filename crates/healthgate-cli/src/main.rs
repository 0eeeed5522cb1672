//! healthgate — block until an environment is reliably healthy.
//!
//! ```text
//! healthgate await --config healthgate.toml
//! healthgate check --config healthgate.toml --format json
//! healthgate init
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "healthgate",
    about = "Healthgate — gate automation on a reliably healthy environment",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run probes until they pass the configured number of consecutive
    /// clean rounds, or the attempts run out.
    Await {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run every probe once and print the result.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Write a starter healthgate.toml.
    Init {
        /// Directory to write into (default: current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to the config file
    #[arg(short, long, default_value = "healthgate.toml")]
    config: PathBuf,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,
}

/// Command-line overrides for the `[evaluation]` section.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Attempts per round before giving up
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Delay between failing attempts (e.g. "5s")
    #[arg(long)]
    pub delay: Option<String>,
    /// Consecutive clean rounds required
    #[arg(long)]
    pub assurance_attempts: Option<u32>,
    /// Delay between clean rounds
    #[arg(long)]
    pub assurance_delay: Option<String>,
    /// Wait before the first round
    #[arg(long)]
    pub wait_before: Option<String>,
    /// Wait after the last round
    #[arg(long)]
    pub wait_after: Option<String>,
    /// Log attempt exhaustion instead of failing hard
    #[arg(long)]
    pub permissive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("healthgate=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Await { config, overrides } => {
            commands::wait::run(&config.config, &config.format, &overrides).await
        }
        Commands::Check { config } => commands::check::run(&config.config, &config.format).await,
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
