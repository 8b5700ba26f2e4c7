//! Constants used throughout the MedLink core crate.
//!
//! The share-link shape is a wire contract between independently built issuers and scanners, so
//! the route prefix, query parameter name and freshness window all live here.

/// Route prefix every patient share link must carry.
pub const PROFILE_PATH_PREFIX: &str = "/patient/profile/";

/// Query parameter holding the issuance timestamp (ms since Unix epoch).
pub const TIMESTAMP_PARAM: &str = "ts";

/// Freshness window of a share link, in milliseconds.
pub const EXPIRATION_MS: i64 = 120_000;

/// Default origin used when no application origin is configured.
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";

/// Default tolerance for share links stamped slightly in the future.
pub const DEFAULT_MAX_CLOCK_SKEW_MS: i64 = 30_000;

/// Default live-scan polling interval (roughly one display refresh at 30 Hz).
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 33;

/// Maximum accepted length of a patient identifier.
pub const MAX_PATIENT_ID_LEN: usize = 128;

/// Message shown when the decoded payload is not a URL.
pub const MSG_NOT_A_URL: &str = "not a valid URL";

/// Message shown when the decoded URL is not a share link of this application.
pub const MSG_INVALID_APP_CODE: &str = "invalid application QR code";

/// Message shown when a share link is past its freshness window.
pub const MSG_EXPIRED: &str = "expired code, request a new one";

/// Message shown when a single-use share link is presented a second time.
pub const MSG_ALREADY_USED: &str = "code already used, request a new one";

/// Message shown when the camera cannot be acquired.
pub const MSG_CAMERA_UNAVAILABLE: &str = "enable camera permissions to scan a code";

/// Non-fatal notice for a still image without a readable code.
pub const MSG_NO_CODE_FOUND: &str = "no QR code found, try another image";
