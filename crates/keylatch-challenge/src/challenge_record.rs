use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const CHALLENGE_RECORD_VERSION: &str = "v2";
const CHALLENGE_RECORD_FIELD_COUNT: usize = 6;
const CHALLENGE_RECORD_MAX_SLOT: u8 = 9;

/// Hex-encoded fields of a challenge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexField {
    Challenge,
    Hash,
    Salt,
}

impl HexField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Hash => "hash",
            Self::Salt => "salt",
        }
    }
}

impl fmt::Display for HexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when challenge state cannot be read or decoded.
#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("failed to read challenge state {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("challenge state is empty")]
    Empty,
    #[error("challenge state has {found} fields (expected 6)")]
    FieldCount { found: usize },
    #[error("unsupported challenge state version '{version}' (expected v2)")]
    UnsupportedVersion { version: String },
    #[error("{field} is not a valid hex string: {detail}")]
    InvalidHex { field: HexField, detail: String },
    #[error("iterations '{value}' is not a valid positive number")]
    InvalidIterations { value: String },
    #[error("slot '{value}' is not a valid number")]
    InvalidSlot { value: String },
    #[error("slot {slot} is out of range (expected 1-9)")]
    SlotOutOfRange { slot: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Persisted challenge plus the salted PBKDF2 commitment to the expected response.
///
/// Wire form (one line): `v2:<challenge hex>:<hash hex>:<salt hex>:<iterations>:<slot>`.
pub struct ChallengeRecord {
    pub challenge: Vec<u8>,
    pub expected_hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub slot: u8,
}

impl ChallengeRecord {
    /// Reads and decodes the state file at `path`; nothing is cached between calls.
    pub fn load(path: &Path) -> Result<Self, MalformedRecordError> {
        let raw =
            std::fs::read_to_string(path).map_err(|source| MalformedRecordError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::decode(&raw)
    }

    pub fn decode(raw: &str) -> Result<Self, MalformedRecordError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MalformedRecordError::Empty);
        }

        let fields = raw.split(':').collect::<Vec<_>>();
        if fields.len() != CHALLENGE_RECORD_FIELD_COUNT {
            return Err(MalformedRecordError::FieldCount {
                found: fields.len(),
            });
        }
        if fields[0] != CHALLENGE_RECORD_VERSION {
            return Err(MalformedRecordError::UnsupportedVersion {
                version: fields[0].to_string(),
            });
        }

        let challenge = decode_hex_field(HexField::Challenge, fields[1])?;
        let expected_hash = decode_hex_field(HexField::Hash, fields[2])?;
        let salt = decode_hex_field(HexField::Salt, fields[3])?;

        let iterations = parse_decimal::<u32>(fields[4])
            .filter(|iterations| *iterations > 0)
            .ok_or_else(|| MalformedRecordError::InvalidIterations {
                value: fields[4].to_string(),
            })?;
        let slot =
            parse_decimal::<u8>(fields[5]).ok_or_else(|| MalformedRecordError::InvalidSlot {
                value: fields[5].to_string(),
            })?;
        if !(1..=CHALLENGE_RECORD_MAX_SLOT).contains(&slot) {
            return Err(MalformedRecordError::SlotOutOfRange { slot });
        }

        Ok(Self {
            challenge,
            expected_hash,
            salt,
            iterations,
            slot,
        })
    }

    /// Canonical lowercase encoding, accepted by [`ChallengeRecord::decode`].
    pub fn encode(&self) -> String {
        format!(
            "{CHALLENGE_RECORD_VERSION}:{}:{}:{}:{}:{}",
            hex::encode(&self.challenge),
            hex::encode(&self.expected_hash),
            hex::encode(&self.salt),
            self.iterations,
            self.slot
        )
    }

    pub fn challenge_hex(&self) -> String {
        hex::encode(&self.challenge)
    }
}

fn decode_hex_field(field: HexField, raw: &str) -> Result<Vec<u8>, MalformedRecordError> {
    if raw.is_empty() {
        return Err(MalformedRecordError::InvalidHex {
            field,
            detail: "value is empty".to_string(),
        });
    }
    if raw.bytes().any(|byte| byte.is_ascii_uppercase()) {
        return Err(MalformedRecordError::InvalidHex {
            field,
            detail: "uppercase hex digits are not accepted".to_string(),
        });
    }
    hex::decode(raw).map_err(|error| MalformedRecordError::InvalidHex {
        field,
        detail: error.to_string(),
    })
}

// `str::parse` accepts a leading '+', the record format does not.
fn parse_decimal<T: std::str::FromStr>(raw: &str) -> Option<T> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse::<T>().ok()
}
