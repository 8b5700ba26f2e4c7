//! Patient share links.
//!
//! A share link is a capability URL that lets a doctor open a patient's profile without a
//! separate grant step:
//!
//! ```text
//! <app-origin>/patient/profile/<patient-id>?ts=<issued-at, ms since epoch>
//! ```
//!
//! The link is valid for [`EXPIRATION_MS`] after `ts`. Validity is purely time based; the link
//! carries no nonce and nothing is persisted at issuance. See [`crate::replay`] for the optional
//! single-use guard.
//!
//! Validation order matters for the message the scanner shows:
//! 1. payload must parse as a URL ("not a valid URL")
//! 2. origin must match when origin enforcement is on
//! 3. path must be `/patient/profile/<id>` and `ts` must be present
//! 4. `ts` must be an integer and not too far in the future
//! 5. `now - ts > EXPIRATION_MS` means expired; exactly `EXPIRATION_MS` is still accepted

use crate::config::CoreConfig;
use crate::constants::{
    EXPIRATION_MS, MSG_EXPIRED, MSG_INVALID_APP_CODE, MSG_NOT_A_URL, PROFILE_PATH_PREFIX,
    TIMESTAMP_PARAM,
};
use crate::error::ScanError;
use crate::patient_id::PatientId;
use url::{Origin, Url};

/// A freshly issued share link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareToken {
    url: Url,
    patient_id: PatientId,
    issued_at_ms: i64,
}

impl ShareToken {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn issued_at_ms(&self) -> i64 {
        self.issued_at_ms
    }

    /// Last instant (inclusive) at which the link still validates.
    pub fn expires_at_ms(&self) -> i64 {
        self.issued_at_ms.saturating_add(EXPIRATION_MS)
    }
}

/// Builds share links for the configured application origin.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    origin: Url,
}

impl TokenIssuer {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_origin(cfg.app_origin().clone())
    }

    pub fn with_origin(origin: Url) -> Self {
        Self { origin }
    }

    /// Issue a share link for `patient_id`, stamped with `now_ms`.
    ///
    /// Every call starts a new freshness window, so callers issue again each time a code is
    /// put on screen.
    pub fn issue(&self, patient_id: &PatientId, now_ms: i64) -> ShareToken {
        let mut url = self.origin.clone();
        url.set_path(&format!("{}{}", PROFILE_PATH_PREFIX, patient_id));
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair(TIMESTAMP_PARAM, &now_ms.to_string());

        tracing::debug!(patient_id = %patient_id, issued_at_ms = now_ms, "issued share link");

        ShareToken {
            url,
            patient_id: patient_id.clone(),
            issued_at_ms: now_ms,
        }
    }
}

/// A share link that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedLink {
    pub patient_id: PatientId,
    pub issued_at_ms: i64,
    /// Route to navigate to: the link's path only, query dropped.
    pub navigate_to: String,
}

/// Checks decoded payloads against the share-link contract.
#[derive(Clone, Debug)]
pub struct TokenValidator {
    expected_origin: Option<Origin>,
    max_clock_skew_ms: i64,
}

impl TokenValidator {
    pub fn new(cfg: &CoreConfig) -> Self {
        let expected_origin = cfg
            .enforce_origin()
            .then(|| cfg.app_origin().origin());
        Self {
            expected_origin,
            max_clock_skew_ms: cfg.max_clock_skew_ms(),
        }
    }

    /// Validator that accepts links from any origin.
    pub fn any_origin(max_clock_skew_ms: i64) -> Self {
        Self {
            expected_origin: None,
            max_clock_skew_ms,
        }
    }

    /// Validate a decoded payload at `now_ms`.
    ///
    /// # Errors
    ///
    /// - [`ScanError::MalformedPayload`] if the payload is not a URL, not from the expected
    ///   origin, not a profile link, or carries a missing/non-integer/future `ts`.
    /// - [`ScanError::ExpiredToken`] if the link is older than [`EXPIRATION_MS`].
    pub fn validate(&self, payload: &str, now_ms: i64) -> Result<ValidatedLink, ScanError> {
        let invalid = || ScanError::MalformedPayload(MSG_INVALID_APP_CODE.into());

        let url = Url::parse(payload.trim())
            .map_err(|_| ScanError::MalformedPayload(MSG_NOT_A_URL.into()))?;

        if let Some(expected) = &self.expected_origin {
            if &url.origin() != expected {
                tracing::warn!(
                    origin = %url.origin().ascii_serialization(),
                    "share link from unexpected origin"
                );
                return Err(invalid());
            }
        }

        let patient_segment = url
            .path()
            .strip_prefix(PROFILE_PATH_PREFIX)
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .ok_or_else(invalid)?;
        let patient_id = PatientId::parse(patient_segment).map_err(|_| invalid())?;

        let ts = url
            .query_pairs()
            .find(|(key, _)| key == TIMESTAMP_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(invalid)?;
        let issued_at_ms: i64 = ts.parse().map_err(|_| invalid())?;

        if issued_at_ms.saturating_sub(now_ms) > self.max_clock_skew_ms {
            tracing::warn!(issued_at_ms, now_ms, "share link stamped in the future");
            return Err(invalid());
        }

        if now_ms.saturating_sub(issued_at_ms) > EXPIRATION_MS {
            return Err(ScanError::ExpiredToken(MSG_EXPIRED.into()));
        }

        Ok(ValidatedLink {
            patient_id,
            issued_at_ms,
            navigate_to: url.path().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAX_CLOCK_SKEW_MS;

    const T0: i64 = 1_000_000;

    fn cfg() -> CoreConfig {
        CoreConfig::default()
    }

    fn patient(id: &str) -> PatientId {
        PatientId::parse(id).unwrap()
    }

    #[test]
    fn issue_builds_expected_url() {
        let token = TokenIssuer::new(&cfg()).issue(&patient("abc123"), T0);
        assert_eq!(
            token.url().as_str(),
            "http://localhost:3000/patient/profile/abc123?ts=1000000"
        );
        assert_eq!(token.issued_at_ms(), T0);
        assert_eq!(token.expires_at_ms(), T0 + EXPIRATION_MS);
    }

    #[test]
    fn each_issue_gets_its_own_timestamp() {
        let issuer = TokenIssuer::new(&cfg());
        let first = issuer.issue(&patient("p1"), T0);
        let second = issuer.issue(&patient("p1"), T0 + 1);
        assert_ne!(first.url(), second.url());
    }

    #[test]
    fn issue_then_validate_at_same_instant_succeeds() {
        let validator = TokenValidator::new(&cfg());
        for id in ["p", "patient-42", "550e8400e29b41d4a716446655440000", "A.b_c"] {
            let token = TokenIssuer::new(&cfg()).issue(&patient(id), T0);
            let link = validator.validate(token.url().as_str(), T0).unwrap();
            assert_eq!(link.navigate_to, format!("/patient/profile/{id}"));
            assert_eq!(link.patient_id.as_str(), id);
            assert_eq!(link.issued_at_ms, T0);
        }
    }

    #[test]
    fn scan_fifty_seconds_later_is_valid() {
        let token = TokenIssuer::new(&cfg()).issue(&patient("abc"), T0);
        let link = TokenValidator::new(&cfg())
            .validate(token.url().as_str(), 1_050_000)
            .unwrap();
        assert_eq!(link.navigate_to, "/patient/profile/abc");
    }

    #[test]
    fn scan_one_hundred_thirty_seconds_later_is_expired() {
        let token = TokenIssuer::new(&cfg()).issue(&patient("abc"), T0);
        let err = TokenValidator::new(&cfg())
            .validate(token.url().as_str(), 1_130_000)
            .unwrap_err();
        assert_eq!(err, ScanError::ExpiredToken(MSG_EXPIRED.into()));
    }

    #[test]
    fn expiry_boundary() {
        let token = TokenIssuer::new(&cfg()).issue(&patient("abc"), T0);
        let validator = TokenValidator::new(&cfg());
        let url = token.url().as_str();

        assert!(validator.validate(url, T0 + 119_999).is_ok());
        assert!(validator.validate(url, T0 + EXPIRATION_MS).is_ok());
        assert!(matches!(
            validator.validate(url, T0 + 120_001),
            Err(ScanError::ExpiredToken(_))
        ));
    }

    #[test]
    fn not_a_url_is_malformed() {
        let err = TokenValidator::new(&cfg())
            .validate("not a url", T0)
            .unwrap_err();
        assert_eq!(err, ScanError::MalformedPayload(MSG_NOT_A_URL.into()));
    }

    #[test]
    fn missing_ts_is_malformed() {
        let err = TokenValidator::new(&cfg())
            .validate("http://localhost:3000/patient/profile/123", T0)
            .unwrap_err();
        assert_eq!(err, ScanError::MalformedPayload(MSG_INVALID_APP_CODE.into()));
    }

    #[test]
    fn wrong_prefix_is_malformed() {
        let err = TokenValidator::new(&cfg())
            .validate("http://localhost:3000/doctor/profile/123?ts=1000000", T0)
            .unwrap_err();
        assert_eq!(err, ScanError::MalformedPayload(MSG_INVALID_APP_CODE.into()));
    }

    #[test]
    fn prefix_must_lead_the_path() {
        let validator = TokenValidator::new(&cfg());
        for payload in [
            "http://localhost:3000/evil/patient/profile/123?ts=1000000",
            "http://localhost:3000/patient/profile/?ts=1000000",
            "http://localhost:3000/patient/profile/123/extra?ts=1000000",
        ] {
            assert!(
                matches!(
                    validator.validate(payload, T0),
                    Err(ScanError::MalformedPayload(_))
                ),
                "{payload} should be rejected"
            );
        }
    }

    #[test]
    fn non_integer_ts_is_malformed() {
        let err = TokenValidator::new(&cfg())
            .validate("http://localhost:3000/patient/profile/123?ts=soon", T0)
            .unwrap_err();
        assert!(matches!(err, ScanError::MalformedPayload(_)));
    }

    #[test]
    fn far_future_ts_is_malformed() {
        let validator = TokenValidator::new(&cfg());
        let within = format!(
            "http://localhost:3000/patient/profile/123?ts={}",
            T0 + DEFAULT_MAX_CLOCK_SKEW_MS
        );
        let beyond = format!(
            "http://localhost:3000/patient/profile/123?ts={}",
            T0 + DEFAULT_MAX_CLOCK_SKEW_MS + 1
        );
        assert!(validator.validate(&within, T0).is_ok());
        assert!(matches!(
            validator.validate(&beyond, T0),
            Err(ScanError::MalformedPayload(_))
        ));
    }

    #[test]
    fn foreign_origin_rejected_when_enforced() {
        let payload = "https://evil.example.com/patient/profile/123?ts=1000000";
        let err = TokenValidator::new(&cfg()).validate(payload, T0).unwrap_err();
        assert_eq!(err, ScanError::MalformedPayload(MSG_INVALID_APP_CODE.into()));

        let relaxed = TokenValidator::any_origin(DEFAULT_MAX_CLOCK_SKEW_MS);
        assert!(relaxed.validate(payload, T0).is_ok());
    }

    #[test]
    fn extra_query_parameters_are_dropped_from_navigation() {
        let link = TokenValidator::new(&cfg())
            .validate(
                "http://localhost:3000/patient/profile/123?utm=x&ts=1000000#top",
                T0,
            )
            .unwrap();
        assert_eq!(link.navigate_to, "/patient/profile/123");
    }
}
