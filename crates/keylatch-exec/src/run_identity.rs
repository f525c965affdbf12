use nix::unistd::{getegid, geteuid, User};
use thiserror::Error;

/// Error returned when the configured run-as user cannot be resolved.
#[derive(Debug, Error)]
pub enum IdentityLookupError {
    #[error("run-as user name cannot be empty")]
    EmptyName,
    #[error("could not look up user '{user}': no such user")]
    UnknownUser { user: String },
    #[error("could not look up user '{user}': {source}")]
    Lookup {
        user: String,
        #[source]
        source: nix::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Credentials applied to every spawned child when they differ from the current process.
pub struct RunAsIdentity {
    pub user_name: String,
    pub uid: u32,
    pub gid: u32,
}

impl RunAsIdentity {
    /// Resolves `user` through the passwd database.
    ///
    /// Returns `Ok(None)` when the user maps to the effective uid/gid of the process,
    /// since no credential switch is needed in that case.
    pub fn resolve(user: &str) -> Result<Option<Self>, IdentityLookupError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(IdentityLookupError::EmptyName);
        }
        let entry = User::from_name(user)
            .map_err(|source| IdentityLookupError::Lookup {
                user: user.to_string(),
                source,
            })?
            .ok_or_else(|| IdentityLookupError::UnknownUser {
                user: user.to_string(),
            })?;

        let uid = entry.uid.as_raw();
        let gid = entry.gid.as_raw();
        if uid == geteuid().as_raw() && gid == getegid().as_raw() {
            return Ok(None);
        }
        Ok(Some(Self {
            user_name: entry.name,
            uid,
            gid,
        }))
    }
}
