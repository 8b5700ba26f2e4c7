//! # MedLink Core
//!
//! Patient profile sharing through short-lived QR codes.
//!
//! A patient shows a code carrying a share link
//! (`<origin>/patient/profile/<patient-id>?ts=<epoch-ms>`); a doctor scans it from a live camera
//! or an uploaded image, and a link that is well formed, from the expected origin and younger than
//! two minutes opens the patient's profile.
//!
//! This crate contains:
//! - share-link issuance and validation ([`token`], [`share`], [`replay`])
//! - the scan session state machine and its live/still drivers ([`scan`])
//! - QR rendering ([`render`])
//! - startup configuration ([`config`]) and the time source ([`clock`])
//!
//! **No API concerns**: HTTP servers, API keys and request types belong in `api-rest` or
//! `api-shared`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod patient_id;
pub mod render;
pub mod replay;
pub mod scan;
pub mod share;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ScanError};
pub use patient_id::PatientId;
pub use share::ShareLinkService;
pub use token::{ShareToken, TokenIssuer, TokenValidator, ValidatedLink};
