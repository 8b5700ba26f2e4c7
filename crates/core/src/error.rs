use crate::constants::{MSG_CAMERA_UNAVAILABLE, MSG_NO_CODE_FOUND};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid patient id: {0}")]
    InvalidPatientId(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("failed to render QR code: {0}")]
    QrRender(#[from] qrcode::types::QrError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures a scan can run into.
///
/// Only [`ScanError::DecodeNotFound`] is recoverable; every other variant ends the scan session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Camera permission denied or no usable device.
    #[error("{}", MSG_CAMERA_UNAVAILABLE)]
    CameraUnavailable(String),
    /// No code could be read from the frame or image.
    #[error("{}", MSG_NO_CODE_FOUND)]
    DecodeNotFound,
    /// Decoded text is not a URL or not a share link of this application.
    #[error("{0}")]
    MalformedPayload(String),
    /// Share link is well formed but past its freshness window.
    #[error("{0}")]
    ExpiredToken(String),
}

impl ScanError {
    /// Whether the session must stop after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::DecodeNotFound)
    }
}
