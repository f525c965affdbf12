//! Lock/unlock state machine for keylatch.
//!
//! Sequences the lock-state probe, the token challenge-response and the configured
//! lock/unlock actions for one inbound event per process invocation.

pub mod auth_engine;
pub mod device_presence;

pub use auth_engine::*;
pub use device_presence::*;
