//! Scan session state machine.
//!
//! ```text
//! AcquiringCamera ──denied──▶ CameraUnavailable
//!        │
//!     acquired
//!        ▼
//!     Scanning ──not found──▶ Scanning
//!        │
//!     decoded ──▶ DecodedValid | DecodedInvalid | DecodedExpired
//! ```
//!
//! Still-image sessions start in `Scanning`. Every state other than `AcquiringCamera` and
//! `Scanning` is terminal: once entered, all further input is ignored, the decoder is not called
//! and no navigation is produced again. Whether to keep polling is answered by
//! [`ScanSession::is_terminal`] alone.
//!
//! `CameraUnavailable` only ends the live path. [`ScanSession::fallback_to_still`] moves such a
//! session back to `Scanning` so an uploaded image can still be read.

use crate::constants::{MSG_CAMERA_UNAVAILABLE, MSG_NO_CODE_FOUND};
use crate::error::ScanError;
use crate::scan::frame::{Frame, FrameDecoder, InversionMode};
use crate::token::TokenValidator;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanState {
    AcquiringCamera,
    Scanning,
    DecodedValid { navigate_to: String },
    DecodedInvalid { message: String },
    DecodedExpired { message: String },
    CameraUnavailable { message: String },
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanState::AcquiringCamera | ScanState::Scanning)
    }

    /// User-facing message for terminal failure states.
    pub fn message(&self) -> Option<&str> {
        match self {
            ScanState::DecodedInvalid { message }
            | ScanState::DecodedExpired { message }
            | ScanState::CameraUnavailable { message } => Some(message),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanState::AcquiringCamera => "acquiring_camera",
            ScanState::Scanning => "scanning",
            ScanState::DecodedValid { .. } => "decoded_valid",
            ScanState::DecodedInvalid { .. } => "decoded_invalid",
            ScanState::DecodedExpired { .. } => "decoded_expired",
            ScanState::CameraUnavailable { .. } => "camera_unavailable",
        }
    }
}

/// Result of feeding one frame or payload to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session was not accepting input; nothing happened.
    Ignored,
    /// No code in the frame. Live scans retry, still scans show this notice.
    NotFound { notice: &'static str },
    /// Session reached this terminal state.
    Finished(ScanState),
}

/// Receives the one navigation a successful scan produces.
pub trait Navigator {
    fn navigate(&mut self, path: &str);
}

/// Transient, in-memory state of one scan.
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    state: ScanState,
    validator: TokenValidator,
    last_frame: Option<(u32, u32)>,
    payload: Option<String>,
}

impl ScanSession {
    /// Session for the live camera path, starting in `AcquiringCamera`.
    pub fn live(validator: TokenValidator) -> Self {
        Self::with_state(validator, ScanState::AcquiringCamera)
    }

    /// Session for the still-image path, starting in `Scanning`.
    pub fn still_image(validator: TokenValidator) -> Self {
        Self::with_state(validator, ScanState::Scanning)
    }

    fn with_state(validator: TokenValidator, state: ScanState) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            validator,
            last_frame: None,
            payload: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn into_state(self) -> ScanState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Dimensions of the last frame handed to the decoder.
    pub fn last_frame(&self) -> Option<(u32, u32)> {
        self.last_frame
    }

    /// Payload that ended the session, if one was decoded.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Camera stream obtained: `AcquiringCamera` → `Scanning`.
    pub fn camera_acquired(&mut self) {
        if self.state == ScanState::AcquiringCamera {
            self.transition(ScanState::Scanning);
        }
    }

    /// Camera refused or missing: `AcquiringCamera` → `CameraUnavailable`.
    pub fn camera_denied(&mut self, reason: &str) {
        if self.state == ScanState::AcquiringCamera {
            tracing::warn!(session_id = %self.id, reason, "camera unavailable");
            self.transition(ScanState::CameraUnavailable {
                message: MSG_CAMERA_UNAVAILABLE.into(),
            });
        }
    }

    /// Switch a camera-denied session to still-image input: `CameraUnavailable` → `Scanning`.
    ///
    /// Returns whether the session is now accepting images. Decoded states are left alone.
    pub fn fallback_to_still(&mut self) -> bool {
        if matches!(self.state, ScanState::CameraUnavailable { .. }) {
            self.transition(ScanState::Scanning);
        }
        self.state == ScanState::Scanning
    }

    /// Decode `frame` and, if a payload is found, validate it at `now_ms`.
    ///
    /// Does not call the decoder unless the session is `Scanning`.
    pub fn process_frame<D>(
        &mut self,
        frame: &Frame,
        decoder: &mut D,
        mode: InversionMode,
        now_ms: i64,
    ) -> FrameOutcome
    where
        D: FrameDecoder + ?Sized,
    {
        if self.state != ScanState::Scanning {
            return FrameOutcome::Ignored;
        }

        self.last_frame = Some((frame.width(), frame.height()));
        match decoder.decode(frame, mode) {
            Some(payload) => self.submit_payload(&payload, now_ms),
            None => FrameOutcome::NotFound {
                notice: MSG_NO_CODE_FOUND,
            },
        }
    }

    /// Validate an already decoded payload at `now_ms` and move to the matching terminal state.
    pub fn submit_payload(&mut self, payload: &str, now_ms: i64) -> FrameOutcome {
        if self.state != ScanState::Scanning {
            return FrameOutcome::Ignored;
        }

        self.payload = Some(payload.to_owned());
        let next = match self.validator.validate(payload, now_ms) {
            Ok(link) => ScanState::DecodedValid {
                navigate_to: link.navigate_to,
            },
            Err(ScanError::ExpiredToken(message)) => ScanState::DecodedExpired { message },
            Err(ScanError::MalformedPayload(message)) => ScanState::DecodedInvalid { message },
            Err(other) => ScanState::DecodedInvalid {
                message: other.to_string(),
            },
        };

        self.transition(next.clone());
        FrameOutcome::Finished(next)
    }

    fn transition(&mut self, next: ScanState) {
        tracing::debug!(
            session_id = %self.id,
            from = self.state.name(),
            to = next.name(),
            "scan state transition"
        );
        if next.is_terminal() {
            tracing::info!(session_id = %self.id, outcome = next.name(), "scan finished");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::constants::{MSG_EXPIRED, MSG_INVALID_APP_CODE, MSG_NOT_A_URL};
    use crate::scan::frame::PixelFormat;
    use std::collections::VecDeque;

    /// Decoder replaying scripted results and counting calls.
    struct Scripted {
        results: VecDeque<Option<String>>,
        calls: usize,
    }

    impl Scripted {
        fn new(results: &[Option<&str>]) -> Self {
            Self {
                results: results.iter().map(|r| r.map(str::to_owned)).collect(),
                calls: 0,
            }
        }
    }

    impl FrameDecoder for Scripted {
        fn decode(&mut self, _frame: &Frame, _mode: InversionMode) -> Option<String> {
            self.calls += 1;
            self.results.pop_front().flatten()
        }
    }

    fn frame() -> Frame {
        Frame::new(2, 2, PixelFormat::Luma8, vec![0; 4]).unwrap()
    }

    fn validator() -> TokenValidator {
        TokenValidator::new(&CoreConfig::default())
    }

    const LINK: &str = "http://localhost:3000/patient/profile/abc?ts=1000000";

    #[test]
    fn live_session_starts_acquiring_and_ignores_frames() {
        let mut session = ScanSession::live(validator());
        let mut decoder = Scripted::new(&[Some(LINK)]);

        let outcome = session.process_frame(&frame(), &mut decoder, InversionMode::default(), 0);
        assert_eq!(outcome, FrameOutcome::Ignored);
        assert_eq!(decoder.calls, 0);
        assert_eq!(session.state(), &ScanState::AcquiringCamera);
    }

    #[test]
    fn camera_denied_is_terminal() {
        let mut session = ScanSession::live(validator());
        session.camera_denied("permission denied");

        assert!(session.is_terminal());
        assert_eq!(session.state().message(), Some(MSG_CAMERA_UNAVAILABLE));

        session.camera_acquired();
        assert_eq!(session.state().name(), "camera_unavailable");
    }

    #[test]
    fn camera_denied_session_falls_back_to_still_images() {
        let mut session = ScanSession::live(validator());
        session.camera_denied("NotAllowedError");

        assert!(session.fallback_to_still());
        assert_eq!(session.state(), &ScanState::Scanning);

        session.submit_payload(LINK, 1_010_000);
        assert!(matches!(session.state(), ScanState::DecodedValid { .. }));
        assert!(!session.fallback_to_still());
        assert!(matches!(session.state(), ScanState::DecodedValid { .. }));
    }

    #[test]
    fn fallback_does_not_skip_camera_acquisition() {
        let mut session = ScanSession::live(validator());
        assert!(!session.fallback_to_still());
        assert_eq!(session.state(), &ScanState::AcquiringCamera);
    }

    #[test]
    fn not_found_keeps_scanning() {
        let mut session = ScanSession::still_image(validator());
        let mut decoder = Scripted::new(&[None]);

        let outcome =
            session.process_frame(&frame(), &mut decoder, InversionMode::default(), 1_000_000);
        assert_eq!(
            outcome,
            FrameOutcome::NotFound {
                notice: MSG_NO_CODE_FOUND
            }
        );
        assert_eq!(session.state(), &ScanState::Scanning);
        assert_eq!(session.last_frame(), Some((2, 2)));
    }

    #[test]
    fn valid_scan_fifty_seconds_after_issue() {
        let mut session = ScanSession::live(validator());
        session.camera_acquired();
        let mut decoder = Scripted::new(&[Some(LINK)]);

        let outcome =
            session.process_frame(&frame(), &mut decoder, InversionMode::default(), 1_050_000);
        assert_eq!(
            outcome,
            FrameOutcome::Finished(ScanState::DecodedValid {
                navigate_to: "/patient/profile/abc".into()
            })
        );
        assert_eq!(session.payload(), Some(LINK));
    }

    #[test]
    fn expired_scan_one_hundred_thirty_seconds_after_issue() {
        let mut session = ScanSession::still_image(validator());
        session.submit_payload(LINK, 1_130_000);
        assert_eq!(
            session.state(),
            &ScanState::DecodedExpired {
                message: MSG_EXPIRED.into()
            }
        );
    }

    #[test]
    fn malformed_payloads_are_invalid() {
        let mut session = ScanSession::still_image(validator());
        session.submit_payload("not a url", 0);
        assert_eq!(session.state().message(), Some(MSG_NOT_A_URL));

        let mut session = ScanSession::still_image(validator());
        session.submit_payload("http://localhost:3000/doctor/profile/1?ts=0", 0);
        assert_eq!(session.state().message(), Some(MSG_INVALID_APP_CODE));
    }

    #[test]
    fn terminal_state_is_idempotent() {
        let mut session = ScanSession::live(validator());
        session.camera_acquired();
        let mut decoder = Scripted::new(&[Some(LINK), Some(LINK), Some("not a url")]);

        let first =
            session.process_frame(&frame(), &mut decoder, InversionMode::default(), 1_000_000);
        assert!(matches!(first, FrameOutcome::Finished(ScanState::DecodedValid { .. })));

        for _ in 0..3 {
            let again =
                session.process_frame(&frame(), &mut decoder, InversionMode::default(), 9_999_999);
            assert_eq!(again, FrameOutcome::Ignored);
        }
        assert_eq!(session.submit_payload("not a url", 0), FrameOutcome::Ignored);
        assert_eq!(decoder.calls, 1);
        assert!(matches!(session.state(), ScanState::DecodedValid { .. }));
    }
}
