use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use crate::run_identity::{IdentityLookupError, RunAsIdentity};

/// Error returned by a single command execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("empty command given")]
    EmptyCommand,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to collect output of '{program}': {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command '{program}' failed: {status}")]
    Exit { program: String, status: ExitStatus },
}

/// Whether the caller blocks on the child or releases it right after spawning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Block until exit, capture stdout, fail on a non-success status.
    Wait,
    /// Spawn and release; the child's eventual exit status is never observed.
    Detached,
}

impl ExecutionMode {
    pub fn is_wait(self) -> bool {
        matches!(self, Self::Wait)
    }
}

/// Seam between the state machine and process execution.
pub trait CommandExecutor {
    /// Runs `command` (program followed by its arguments).
    ///
    /// Returns trimmed stdout in [`ExecutionMode::Wait`] and an empty string in
    /// [`ExecutionMode::Detached`].
    fn run(&self, command: &[String], mode: ExecutionMode) -> Result<String, ExecutionError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, command: &[String], mode: ExecutionMode) -> Result<String, ExecutionError> {
        (**self).run(command, mode)
    }
}

#[derive(Debug, Clone, Default)]
/// Process-backed [`CommandExecutor`] carrying the resolved run-as identity.
pub struct CommandRunner {
    run_as: Option<RunAsIdentity>,
}

impl CommandRunner {
    /// Builds a runner for the optional configured user.
    ///
    /// Lookup failures surface here so no command is ever attempted with an
    /// unresolved identity.
    pub fn for_user(user: Option<&str>) -> Result<Self, IdentityLookupError> {
        let run_as = match user.map(str::trim).filter(|user| !user.is_empty()) {
            Some(user) => RunAsIdentity::resolve(user)?,
            None => None,
        };
        Ok(Self { run_as })
    }

    pub fn run_as(&self) -> Option<&RunAsIdentity> {
        self.run_as.as_ref()
    }

    fn build_command(&self, program: &str, args: &[String]) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        command.stdin(Stdio::null());
        command.stderr(Stdio::inherit());
        if let Some(identity) = self.run_as.as_ref() {
            debug!(
                uid = identity.uid,
                gid = identity.gid,
                "switching child credentials"
            );
            command.uid(identity.uid);
            command.gid(identity.gid);
        }
        command
    }

    fn run_and_capture(&self, program: &str, args: &[String]) -> Result<String, ExecutionError> {
        let mut command = self.build_command(program, args);
        command.stdout(Stdio::piped());
        let child = command.spawn().map_err(|source| ExecutionError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let output = child
            .wait_with_output()
            .map_err(|source| ExecutionError::Output {
                program: program.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExecutionError::Exit {
                program: program.to_string(),
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Spawns the child and drops its handle without waiting on it.
    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<(), ExecutionError> {
        let mut command = self.build_command(program, args);
        command.stdout(Stdio::inherit());
        let child = command.spawn().map_err(|source| ExecutionError::Spawn {
            program: program.to_string(),
            source,
        })?;
        debug!(pid = child.id(), "released detached child");
        drop(child);
        Ok(())
    }
}

impl CommandExecutor for CommandRunner {
    fn run(&self, command: &[String], mode: ExecutionMode) -> Result<String, ExecutionError> {
        let Some((program, args)) = command.split_first() else {
            return Err(ExecutionError::EmptyCommand);
        };

        match self.run_as.as_ref() {
            Some(identity) => info!(
                user = identity.user_name.as_str(),
                wait = mode.is_wait(),
                "running command (as '{}'): {:?}",
                identity.user_name,
                command
            ),
            None => info!(wait = mode.is_wait(), "running command: {:?}", command),
        }

        match mode {
            ExecutionMode::Wait => self.run_and_capture(program, args),
            ExecutionMode::Detached => {
                self.spawn_detached(program, args)?;
                Ok(String::new())
            }
        }
    }
}
