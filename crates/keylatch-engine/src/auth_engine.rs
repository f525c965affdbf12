use std::path::PathBuf;

use keylatch_challenge::{
    pose_challenge, validate_response, ChallengeRecord, HashingError, MalformedRecordError,
    DEFAULT_CHALLENGE_RESPONSE_PROGRAM,
};
use keylatch_exec::{CommandExecutor, ExecutionError, ExecutionMode};
use thiserror::Error;
use tracing::{debug, info, warn, Span};

use crate::device_presence::DevicePresenceProbe;

/// Error returned when an engine operation aborts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read challenge state")]
    Record(#[from] MalformedRecordError),
    #[error("challenge-response failed")]
    ChallengeResponse(#[source] ExecutionError),
    #[error("failed to validate response")]
    Hashing(#[from] HashingError),
    #[error("invalid response provided, rejecting token")]
    AuthenticationRejected,
    #[error("failed to run {action} command")]
    Action {
        action: &'static str,
        #[source]
        source: ExecutionError,
    },
}

impl EngineError {
    /// True for the expected, security-relevant rejection outcome.
    pub fn is_authentication_rejected(&self) -> bool {
        matches!(self, Self::AuthenticationRejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings the state machine needs; empty command lists mean "not configured".
pub struct AuthEngineConfig {
    pub state_file: PathBuf,
    pub lock_command: Vec<String>,
    pub unlock_command: Vec<String>,
    pub locked_command: Vec<String>,
    pub challenge_response_program: String,
}

impl AuthEngineConfig {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            lock_command: Vec::new(),
            unlock_command: Vec::new(),
            locked_command: Vec::new(),
            challenge_response_program: DEFAULT_CHALLENGE_RESPONSE_PROGRAM.to_string(),
        }
    }
}

/// Session lock state as reported by the probe command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
    /// No probe configured; never blocks an action.
    Unknown,
}

/// Token presence events delivered by the device event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Attached,
    Removed,
}

impl DeviceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Removed => "removed",
        }
    }
}

/// What an engine operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    AlreadyLocked,
    NotLocked,
    ActionNotConfigured,
    Locked,
    Unlocked,
    /// Token reported removed but still enumerates; nothing was done.
    TransientRemoval,
}

impl EngineOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyLocked => "already_locked",
            Self::NotLocked => "not_locked",
            Self::ActionNotConfigured => "action_not_configured",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::TransientRemoval => "transient_removal",
        }
    }
}

/// Stateless lock/unlock orchestrator; every operation re-probes the lock state.
///
/// Log records are emitted inside `span`, which the caller builds at the entry point.
pub struct AuthEngine<E, P> {
    config: AuthEngineConfig,
    executor: E,
    presence: P,
    span: Span,
}

impl<E: CommandExecutor, P: DevicePresenceProbe> AuthEngine<E, P> {
    pub fn new(config: AuthEngineConfig, executor: E, presence: P, span: Span) -> Self {
        Self {
            config,
            executor,
            presence,
            span,
        }
    }

    pub fn query_lock_state(&self) -> LockState {
        let _entered = self.span.enter();
        self.probe_lock_state()
    }

    /// True only when a configured probe reports the session as locked.
    pub fn query_locked(&self) -> bool {
        self.query_lock_state() == LockState::Locked
    }

    pub fn lock(&self) -> Result<EngineOutcome, EngineError> {
        let _entered = self.span.enter();
        self.lock_session()
    }

    pub fn unlock(&self) -> Result<EngineOutcome, EngineError> {
        let _entered = self.span.enter();
        self.unlock_session()
    }

    pub fn handle_device_event(&self, event: DeviceEvent) -> Result<EngineOutcome, EngineError> {
        let _entered = self.span.enter();
        debug!(event = event.as_str(), "handling device event");
        match event {
            DeviceEvent::Attached => {
                info!("token was attached");
                self.unlock_session()
            }
            DeviceEvent::Removed => {
                if self.presence.is_present() {
                    debug!("token temporarily disappeared, possibly during challenge-response");
                    return Ok(EngineOutcome::TransientRemoval);
                }
                info!("token was removed");
                self.lock_session()
            }
        }
    }

    fn probe_lock_state(&self) -> LockState {
        if self.config.locked_command.is_empty() {
            debug!(
                "no locked command configured, assuming the lock command handles repeated invocations"
            );
            return LockState::Unknown;
        }
        match self
            .executor
            .run(&self.config.locked_command, ExecutionMode::Wait)
        {
            Ok(_) => LockState::Locked,
            Err(error) => {
                debug!(%error, "locked probe did not succeed");
                LockState::Unlocked
            }
        }
    }

    fn lock_session(&self) -> Result<EngineOutcome, EngineError> {
        if self.probe_lock_state() == LockState::Locked {
            debug!("system is already locked");
            return Ok(EngineOutcome::AlreadyLocked);
        }
        if self.config.lock_command.is_empty() {
            debug!("no lock command configured");
            return Ok(EngineOutcome::ActionNotConfigured);
        }

        self.executor
            .run(&self.config.lock_command, ExecutionMode::Detached)
            .map_err(|source| EngineError::Action {
                action: "lock",
                source,
            })?;
        info!("locking successful");
        Ok(EngineOutcome::Locked)
    }

    fn unlock_session(&self) -> Result<EngineOutcome, EngineError> {
        if self.probe_lock_state() == LockState::Unlocked {
            debug!("no lock process detected");
            return Ok(EngineOutcome::NotLocked);
        }

        debug!(state_file = %self.config.state_file.display(), "preparing challenge-response");
        let record = ChallengeRecord::load(&self.config.state_file)?;
        let response = pose_challenge(
            &self.executor,
            &self.config.challenge_response_program,
            &record,
        )
        .map_err(EngineError::ChallengeResponse)?;

        if !validate_response(&record, &response)? {
            warn!(outcome = "rejected", "invalid response provided, rejecting token");
            return Err(EngineError::AuthenticationRejected);
        }
        debug!("valid response provided");

        if self.config.unlock_command.is_empty() {
            debug!("no unlock command configured");
            return Ok(EngineOutcome::ActionNotConfigured);
        }
        self.executor
            .run(&self.config.unlock_command, ExecutionMode::Detached)
            .map_err(|source| EngineError::Action {
                action: "unlock",
                source,
            })?;
        info!("unlocking completed successfully");
        Ok(EngineOutcome::Unlocked)
    }
}
