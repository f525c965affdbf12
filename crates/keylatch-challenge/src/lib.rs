//! Challenge records and response validation for keylatch.
//!
//! Decodes the persisted `v2` challenge state, poses the challenge to the token's
//! challenge-response program and checks the answer against the stored PBKDF2 hash.

pub mod challenge_record;
pub mod challenge_response;
pub mod response_validator;

pub use challenge_record::*;
pub use challenge_response::*;
pub use response_validator::*;
