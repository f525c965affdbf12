use keylatch_exec::{CommandExecutor, ExecutionError, ExecutionMode};
use tracing::debug;

use crate::challenge_record::ChallengeRecord;

pub const DEFAULT_CHALLENGE_RESPONSE_PROGRAM: &str = "ykchalresp";

/// Builds `<program> -<slot> -H -x <challenge hex>`.
pub fn challenge_response_command(program: &str, record: &ChallengeRecord) -> Vec<String> {
    vec![
        program.to_string(),
        format!("-{}", record.slot),
        "-H".to_string(),
        "-x".to_string(),
        record.challenge_hex(),
    ]
}

/// Sends the record's challenge to the token and returns its trimmed textual response.
pub fn pose_challenge<E: CommandExecutor>(
    executor: &E,
    program: &str,
    record: &ChallengeRecord,
) -> Result<String, ExecutionError> {
    debug!(slot = record.slot, "posing challenge");
    let command = challenge_response_command(program, record);
    executor.run(&command, ExecutionMode::Wait)
}
