use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "keylatch",
    about = "Locks and unlocks a session based on hardware token challenge-response",
    version
)]
/// Top-level command line of the keylatch binary.
pub struct Cli {
    #[arg(
        long,
        short = 'v',
        global = true,
        help = "Enable debug logging regardless of the config file's verbose setting"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

impl Cli {
    pub fn config_path(&self) -> &Path {
        match &self.command {
            CliCommand::Lock(args) | CliCommand::Unlock(args) => args.config.as_path(),
            CliCommand::SystemdEvent(args) => args.config.as_path(),
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self.command {
            CliCommand::Lock(_) => "lock",
            CliCommand::Unlock(_) => "unlock",
            CliCommand::SystemdEvent(_) => "systemd-event",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the lock command unless the session is already locked.
    Lock(CliConfigArgs),
    /// Verify the token and run the unlock command.
    Unlock(CliConfigArgs),
    /// Handle a token add/remove event dispatched by systemd/udev.
    SystemdEvent(CliSystemdEventArgs),
}

#[derive(Debug, Args)]
pub struct CliConfigArgs {
    #[arg(
        value_name = "CONFIG_FILE",
        env = "KEYLATCH_CONFIG",
        help = "Path to the keylatch JSON configuration file"
    )]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct CliSystemdEventArgs {
    #[arg(value_enum, value_name = "ACTION")]
    pub action: CliDeviceAction,

    #[arg(
        value_name = "CONFIG_FILE",
        env = "KEYLATCH_CONFIG",
        help = "Path to the keylatch JSON configuration file"
    )]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliDeviceAction {
    Add,
    Remove,
}
