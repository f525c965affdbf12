use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error returned when the configuration file cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no state_file configured")]
    MissingStateFile,
    #[error("invalid {key} in config file: {reason}")]
    InvalidCommand { key: &'static str, reason: String },
}

/// Command settings accept either an argv array or a shell-style command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CommandSetting {
    Argv(Vec<String>),
    Line(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeylatchConfigFile {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    state_file: Option<PathBuf>,
    #[serde(default)]
    lock_command: Option<CommandSetting>,
    #[serde(default)]
    unlock_command: Option<CommandSetting>,
    #[serde(default)]
    locked_command: Option<CommandSetting>,
    #[serde(default)]
    challenge_response_program: Option<String>,
    #[serde(default)]
    presence_command: Option<CommandSetting>,
    #[serde(default)]
    presence_marker: Option<String>,
    #[serde(default)]
    verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Validated keylatch configuration; empty command lists mean "not configured".
pub struct KeylatchConfig {
    pub user: Option<String>,
    pub state_file: PathBuf,
    pub lock_command: Vec<String>,
    pub unlock_command: Vec<String>,
    pub locked_command: Vec<String>,
    pub challenge_response_program: Option<String>,
    pub presence_command: Option<Vec<String>>,
    pub presence_marker: Option<String>,
    pub verbose: bool,
}

impl KeylatchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed =
            serde_json::from_str::<KeylatchConfigFile>(&raw).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        Self::from_file(parsed)
    }

    fn from_file(file: KeylatchConfigFile) -> Result<Self, ConfigError> {
        let state_file = file
            .state_file
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingStateFile)?;

        Ok(Self {
            user: non_blank(file.user),
            state_file,
            lock_command: resolve_command("lock_command", file.lock_command)?,
            unlock_command: resolve_command("unlock_command", file.unlock_command)?,
            locked_command: resolve_command("locked_command", file.locked_command)?,
            challenge_response_program: non_blank(file.challenge_response_program),
            presence_command: match file.presence_command {
                Some(setting) => Some(resolve_command("presence_command", Some(setting))?)
                    .filter(|command| !command.is_empty()),
                None => None,
            },
            presence_marker: non_blank(file.presence_marker),
            verbose: file.verbose,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_command(
    key: &'static str,
    setting: Option<CommandSetting>,
) -> Result<Vec<String>, ConfigError> {
    let tokens = match setting {
        None => Vec::new(),
        Some(CommandSetting::Argv(tokens)) => tokens,
        Some(CommandSetting::Line(line)) => {
            shell_words::split(line.trim()).map_err(|error| ConfigError::InvalidCommand {
                key,
                reason: error.to_string(),
            })?
        }
    };
    if tokens.first().is_some_and(|program| program.trim().is_empty()) {
        return Err(ConfigError::InvalidCommand {
            key,
            reason: "program name cannot be empty".to_string(),
        });
    }
    Ok(tokens)
}
