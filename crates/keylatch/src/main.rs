//! keylatch: locks and unlocks a desktop session with a hardware token challenge-response.

mod bootstrap_helpers;
mod startup_dispatch;

use anyhow::{Context, Result};
use clap::Parser;
use keylatch_cli::{Cli, KeylatchConfig};

use crate::bootstrap_helpers::build_subscriber;
use crate::startup_dispatch::run_command;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = KeylatchConfig::load(cli.config_path())
        .with_context(|| format!("failed to load {}", cli.config_path().display()))?;

    let subscriber = build_subscriber(cli.verbose || config.verbose);
    tracing::subscriber::with_default(subscriber, || {
        run_command(&cli.command, cli.command_name(), &config).map(|_| ())
    })
}
