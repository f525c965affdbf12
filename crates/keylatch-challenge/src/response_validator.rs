use hmac::Hmac;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::challenge_record::ChallengeRecord;

/// Output length of the token's HMAC-SHA1 response, reused as the PBKDF2 key length.
pub const RESPONSE_HASH_LENGTH: usize = 20;

/// Error returned when the comparison hash cannot be derived.
#[derive(Debug, Error)]
pub enum HashingError {
    #[error("iteration count must be greater than zero")]
    ZeroIterations,
    #[error("failed to derive response hash: {0}")]
    Derivation(String),
}

/// Computes PBKDF2-HMAC-SHA1 over the UTF-8 bytes of `response`.
pub fn derive_response_hash(
    response: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; RESPONSE_HASH_LENGTH], HashingError> {
    if iterations == 0 {
        return Err(HashingError::ZeroIterations);
    }
    let mut derived = [0u8; RESPONSE_HASH_LENGTH];
    pbkdf2::pbkdf2::<Hmac<Sha1>>(response.as_bytes(), salt, iterations, &mut derived)
        .map_err(|error| HashingError::Derivation(error.to_string()))?;
    Ok(derived)
}

/// Returns true when `response` hashes to the record's expected value.
///
/// A stored hash of a different length never matches; it is not an error.
pub fn validate_response(record: &ChallengeRecord, response: &str) -> Result<bool, HashingError> {
    let derived = derive_response_hash(response, &record.salt, record.iterations)?;
    if derived.len() != record.expected_hash.len() {
        return Ok(false);
    }
    Ok(bool::from(
        derived.as_slice().ct_eq(record.expected_hash.as_slice()),
    ))
}
