//! API-key checking for the REST API.
//!
//! The expected key is resolved once at startup and handed in; nothing here reads the
//! environment.

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing {API_KEY_HEADER} header")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
}

/// Validates the provided API key against the expected one.
///
/// The comparison takes the same time for every key of a given length.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let provided = provided.ok_or(AuthError::MissingKey)?;

    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    let diff = a
        .iter()
        .zip(b)
        .fold((a.len() ^ b.len()) as u8, |acc, (x, y)| acc | (x ^ y));

    if diff == 0 && a.len() == b.len() {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}
