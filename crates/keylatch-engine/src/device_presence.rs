use std::process::{Command, Stdio};

use tracing::debug;

pub const DEFAULT_PRESENCE_COMMAND: &str = "lsusb";
pub const DEFAULT_PRESENCE_MARKER: &str = "Yubico.com";

/// Answers whether the token is physically attached right now.
pub trait DevicePresenceProbe {
    fn is_present(&self) -> bool;
}

impl<T: DevicePresenceProbe + ?Sized> DevicePresenceProbe for &T {
    fn is_present(&self) -> bool {
        (**self).is_present()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Heuristic probe: runs an enumeration command and looks for a vendor marker in its output.
///
/// Any failure to run the command counts as "absent".
pub struct CommandOutputPresenceProbe {
    pub command: Vec<String>,
    pub marker: String,
}

impl Default for CommandOutputPresenceProbe {
    fn default() -> Self {
        Self {
            command: vec![DEFAULT_PRESENCE_COMMAND.to_string()],
            marker: DEFAULT_PRESENCE_MARKER.to_string(),
        }
    }
}

impl DevicePresenceProbe for CommandOutputPresenceProbe {
    fn is_present(&self) -> bool {
        let Some((program, args)) = self.command.split_first() else {
            debug!("no presence command configured, treating token as absent");
            return false;
        };
        if self.marker.is_empty() {
            debug!("empty presence marker, treating token as absent");
            return false;
        }

        let output = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(error) => {
                debug!(program = program.as_str(), %error, "presence command failed to run");
                return false;
            }
        };

        let combined = [
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ]
        .concat();
        combined.contains(self.marker.as_str())
    }
}
