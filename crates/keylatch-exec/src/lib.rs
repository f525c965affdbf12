//! External command execution for keylatch.
//!
//! Runs lock/unlock actions, lock-state probes and the token challenge-response
//! program, optionally with the child's credentials switched to a configured user.

pub mod command_runner;
pub mod run_identity;

pub use command_runner::*;
pub use run_identity::*;
