use anyhow::{Context, Result};
use keylatch_challenge::DEFAULT_CHALLENGE_RESPONSE_PROGRAM;
use keylatch_cli::{CliCommand, CliDeviceAction, KeylatchConfig};
use keylatch_engine::{
    AuthEngine, AuthEngineConfig, CommandOutputPresenceProbe, DeviceEvent, EngineError,
    EngineOutcome, DEFAULT_PRESENCE_COMMAND, DEFAULT_PRESENCE_MARKER,
};
use keylatch_exec::CommandRunner;
use tracing::{info, info_span};

pub(crate) fn engine_config_from(config: &KeylatchConfig) -> AuthEngineConfig {
    AuthEngineConfig {
        state_file: config.state_file.clone(),
        lock_command: config.lock_command.clone(),
        unlock_command: config.unlock_command.clone(),
        locked_command: config.locked_command.clone(),
        challenge_response_program: config
            .challenge_response_program
            .clone()
            .unwrap_or_else(|| DEFAULT_CHALLENGE_RESPONSE_PROGRAM.to_string()),
    }
}

pub(crate) fn presence_probe_from(config: &KeylatchConfig) -> CommandOutputPresenceProbe {
    CommandOutputPresenceProbe {
        command: config
            .presence_command
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_PRESENCE_COMMAND.to_string()]),
        marker: config
            .presence_marker
            .clone()
            .unwrap_or_else(|| DEFAULT_PRESENCE_MARKER.to_string()),
    }
}

fn device_event_for(action: CliDeviceAction) -> DeviceEvent {
    match action {
        CliDeviceAction::Add => DeviceEvent::Attached,
        CliDeviceAction::Remove => DeviceEvent::Removed,
    }
}

/// Runs one CLI command against the engine; must be called with the subscriber installed.
pub(crate) fn run_command(
    command: &CliCommand,
    command_name: &'static str,
    config: &KeylatchConfig,
) -> Result<EngineOutcome> {
    let runner = CommandRunner::for_user(config.user.as_deref())
        .context("failed to resolve the configured run-as user")?;
    let span = info_span!(
        "keylatch",
        cmd = command_name,
        user = runner.run_as().map(|identity| identity.user_name.as_str())
    );
    let engine = AuthEngine::new(
        engine_config_from(config),
        runner,
        presence_probe_from(config),
        span,
    );

    let result = match command {
        CliCommand::Lock(_) => engine.lock(),
        CliCommand::Unlock(_) => engine.unlock(),
        CliCommand::SystemdEvent(args) => engine.handle_device_event(device_event_for(args.action)),
    };
    let outcome = result.map_err(|error| describe_engine_error(command_name, error))?;
    info!(cmd = command_name, outcome = outcome.as_str(), "command finished");
    Ok(outcome)
}

fn describe_engine_error(command_name: &str, error: EngineError) -> anyhow::Error {
    if error.is_authentication_rejected() {
        anyhow::Error::new(error).context("token authentication failed")
    } else {
        anyhow::Error::new(error).context(format!("keylatch {command_name} failed"))
    }
}
