use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use keylatch_challenge::{derive_response_hash, ChallengeRecord};
use keylatch_engine::{
    AuthEngine, AuthEngineConfig, CommandOutputPresenceProbe, DeviceEvent, EngineError,
    EngineOutcome, LockState,
};
use keylatch_exec::CommandRunner;
use tempfile::{tempdir, TempDir};
use tracing::Span;

const RESPONSE: &str = "8c1f5d2e7a9b0c3d4e5f60718293a4b5c6d7e8f9";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn script(&self, name: &str, body: &str) -> String {
        let path = self.path(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut permissions = fs::metadata(&path).expect("metadata").permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).expect("chmod");
        path.display().to_string()
    }

    fn state_file(&self, response: &str) -> PathBuf {
        let salt = vec![0x5a; 16];
        let record = ChallengeRecord {
            challenge: vec![0xde, 0xad, 0xbe, 0xef],
            expected_hash: derive_response_hash(response, &salt, 1000)
                .expect("hash")
                .to_vec(),
            salt,
            iterations: 1000,
            slot: 1,
        };
        let path = self.path("challenge");
        fs::write(&path, record.encode()).expect("write state");
        path
    }

    /// Lock flag lives in a file; the lock command creates it and the unlock command removes it.
    fn session_commands(&self, config: &mut AuthEngineConfig) {
        let flag = self.lock_flag().display().to_string();
        config.lock_command = shell(&format!("touch '{flag}'"));
        config.unlock_command = shell(&format!("rm -f '{flag}'"));
        config.locked_command = shell(&format!("test -e '{flag}'"));
    }

    fn lock_flag(&self) -> PathBuf {
        self.path("session.locked")
    }
}

fn shell(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn engine(
    config: AuthEngineConfig,
    presence: CommandOutputPresenceProbe,
) -> AuthEngine<CommandRunner, CommandOutputPresenceProbe> {
    AuthEngine::new(config, CommandRunner::default(), presence, Span::none())
}

fn absent_token() -> CommandOutputPresenceProbe {
    CommandOutputPresenceProbe {
        command: vec!["echo".to_string(), "Bus 001 Device 002: hub".to_string()],
        ..CommandOutputPresenceProbe::default()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

fn exists(path: &Path) -> impl FnMut() -> bool + '_ {
    move || path.exists()
}

#[test]
fn integration_lock_then_unlock_cycle_with_real_processes() {
    let workspace = Workspace::new();
    let chalresp = workspace.script("chalresp", &format!("echo {RESPONSE}"));
    let mut config = AuthEngineConfig::new(workspace.state_file(RESPONSE));
    config.challenge_response_program = chalresp;
    workspace.session_commands(&mut config);
    let engine = engine(config, absent_token());

    assert_eq!(engine.query_lock_state(), LockState::Unlocked);
    assert_eq!(engine.lock().expect("lock"), EngineOutcome::Locked);
    assert!(wait_until(exists(&workspace.lock_flag())));
    assert_eq!(engine.lock().expect("second lock"), EngineOutcome::AlreadyLocked);

    assert_eq!(engine.unlock().expect("unlock"), EngineOutcome::Unlocked);
    assert!(wait_until(|| !workspace.lock_flag().exists()));
    assert_eq!(engine.unlock().expect("second unlock"), EngineOutcome::NotLocked);
}

#[test]
fn integration_wrong_response_keeps_session_locked() {
    let workspace = Workspace::new();
    let chalresp = workspace.script("chalresp", "echo not-the-token");
    let mut config = AuthEngineConfig::new(workspace.state_file(RESPONSE));
    config.challenge_response_program = chalresp;
    workspace.session_commands(&mut config);
    fs::write(workspace.lock_flag(), "").expect("pre-lock session");
    let engine = engine(config, absent_token());

    let error = engine.unlock().expect_err("wrong response");
    assert!(error.is_authentication_rejected());
    thread::sleep(Duration::from_millis(200));
    assert!(workspace.lock_flag().exists());
}

#[test]
fn integration_challenge_response_failure_aborts_unlock() {
    let workspace = Workspace::new();
    let chalresp = workspace.script("chalresp", "echo 'no token' >&2; exit 1");
    let mut config = AuthEngineConfig::new(workspace.state_file(RESPONSE));
    config.challenge_response_program = chalresp;
    workspace.session_commands(&mut config);
    fs::write(workspace.lock_flag(), "").expect("pre-lock session");
    let engine = engine(config, absent_token());

    let error = engine.unlock().expect_err("chalresp failure");
    assert!(matches!(error, EngineError::ChallengeResponse(_)));
    assert!(workspace.lock_flag().exists());
}

#[test]
fn integration_device_events_follow_token_presence() {
    let workspace = Workspace::new();
    let chalresp = workspace.script("chalresp", &format!("echo {RESPONSE}"));
    let mut config = AuthEngineConfig::new(workspace.state_file(RESPONSE));
    config.challenge_response_program = chalresp;
    workspace.session_commands(&mut config);

    let present = CommandOutputPresenceProbe {
        command: vec![
            "echo".to_string(),
            "Bus 001 Device 007: ID 1050:0407 Yubico.com Yubikey 4/5".to_string(),
        ],
        ..CommandOutputPresenceProbe::default()
    };
    let blip = engine(config.clone(), present);
    assert_eq!(
        blip.handle_device_event(DeviceEvent::Removed).expect("blip"),
        EngineOutcome::TransientRemoval
    );
    assert!(!workspace.lock_flag().exists());

    let engine = engine(config, absent_token());
    assert_eq!(
        engine.handle_device_event(DeviceEvent::Removed).expect("removed"),
        EngineOutcome::Locked
    );
    assert!(wait_until(exists(&workspace.lock_flag())));
    assert_eq!(
        engine.handle_device_event(DeviceEvent::Attached).expect("attached"),
        EngineOutcome::Unlocked
    );
    assert!(wait_until(|| !workspace.lock_flag().exists()));
}

#[test]
fn regression_locked_probe_with_binary_output_reports_locked() {
    let workspace = Workspace::new();
    let mut config = AuthEngineConfig::new(workspace.path("challenge"));
    config.locked_command = shell("printf '\\377\\376'; exit 0");
    config.lock_command = shell(&format!("touch '{}'", workspace.lock_flag().display()));
    let engine = engine(config, absent_token());

    assert_eq!(engine.query_lock_state(), LockState::Locked);
    assert_eq!(engine.lock().expect("lock"), EngineOutcome::AlreadyLocked);
    let error = engine.unlock().expect_err("unlock proceeds to the missing state file");
    assert!(matches!(error, EngineError::Record(_)));
    thread::sleep(Duration::from_millis(200));
    assert!(!workspace.lock_flag().exists());
}
