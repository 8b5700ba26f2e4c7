//! Request and response bodies shared by the REST API and CLI.
//!
//! Every type derives `ToSchema` so it shows up in the OpenAPI document.

use medlink_core::{ScanError, ShareToken, ValidatedLink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IssueShareLinkReq {
    /// Identifier of the patient whose profile is shared.
    pub patient_id: String,
}

/// A freshly issued share link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IssueShareLinkRes {
    /// Capability URL to encode in the QR code.
    pub url: String,
    pub issued_at_ms: i64,
    /// Last instant at which the link is still accepted.
    pub expires_at_ms: i64,
}

impl From<&ShareToken> for IssueShareLinkRes {
    fn from(token: &ShareToken) -> Self {
        Self {
            url: token.url().to_string(),
            issued_at_ms: token.issued_at_ms(),
            expires_at_ms: token.expires_at_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ValidateShareLinkReq {
    /// Decoded QR text.
    pub payload: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Valid,
    Invalid,
    Expired,
}

/// Outcome of validating a decoded payload.
///
/// `message` is set for `invalid` and `expired`; `navigate_to` only for `valid`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidateShareLinkRes {
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

impl From<Result<ValidatedLink, ScanError>> for ValidateShareLinkRes {
    fn from(result: Result<ValidatedLink, ScanError>) -> Self {
        match result {
            Ok(link) => Self {
                status: LinkStatus::Valid,
                message: None,
                navigate_to: Some(link.navigate_to),
            },
            Err(err @ ScanError::ExpiredToken(_)) => Self {
                status: LinkStatus::Expired,
                message: Some(err.to_string()),
                navigate_to: None,
            },
            Err(err) => Self {
                status: LinkStatus::Invalid,
                message: Some(err.to_string()),
                navigate_to: None,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InvokeFlowReq {
    /// Flow input; its shape depends on the flow.
    #[schema(value_type = Object)]
    pub input: Value,
}

/// JSON error body for endpoints that report a reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
