//! Patient identifiers carried inside share links.
//!
//! A patient id ends up as a single URL path segment, so it is restricted to characters that
//! survive a path segment without percent-encoding. Once constructed, a [`PatientId`] can be
//! embedded into a share link and read back unchanged by the validator.

use crate::constants::MAX_PATIENT_ID_LEN;
use crate::{CoreError, CoreResult};
use std::{fmt, str::FromStr};

/// Opaque, non-empty, path-safe patient identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Validates and wraps a patient identifier.
    ///
    /// Leading and trailing whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPatientId`] if the identifier is empty, longer than
    /// [`MAX_PATIENT_ID_LEN`], or contains anything other than ASCII alphanumerics, `-`, `_`
    /// or `.`.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(CoreError::InvalidPatientId(
                "patient id cannot be empty".into(),
            ));
        }

        if trimmed.len() > MAX_PATIENT_ID_LEN {
            return Err(CoreError::InvalidPatientId(format!(
                "patient id exceeds maximum length of {} characters",
                MAX_PATIENT_ID_LEN
            )));
        }

        // "." and ".." would be resolved away by URL path normalisation.
        if trimmed == "." || trimmed == ".." {
            return Err(CoreError::InvalidPatientId(
                "patient id cannot be a dot segment".into(),
            ));
        }

        if !Self::is_path_safe(trimmed) {
            return Err(CoreError::InvalidPatientId(format!(
                "patient id contains invalid characters (only alphanumeric, '.', '-', '_' allowed): '{}'",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_path_safe(input: &str) -> bool {
        input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'))
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PatientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatientId::parse(s)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::parse(&s).map_err(serde::de::Error::custom)
    }
}
