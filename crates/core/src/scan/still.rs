//! Still-image scanning.
//!
//! One decode attempt per user-supplied image. An image without a readable code only produces a
//! notice; the session stays `Scanning` and the next image can be submitted. A session whose
//! camera was denied accepts images too.

use crate::clock::Clock;
use crate::scan::frame::{Frame, FrameDecoder, InversionMode};
use crate::scan::session::{FrameOutcome, Navigator, ScanSession, ScanState};
use std::sync::Arc;

pub struct StillImageScanner<D, N> {
    decoder: D,
    navigator: N,
    clock: Arc<dyn Clock>,
    mode: InversionMode,
}

impl<D, N> StillImageScanner<D, N>
where
    D: FrameDecoder,
    N: Navigator,
{
    pub fn new(decoder: D, navigator: N, clock: Arc<dyn Clock>) -> Self {
        Self {
            decoder,
            navigator,
            clock,
            mode: InversionMode::default(),
        }
    }

    pub fn with_inversion(mut self, mode: InversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Try to read a share link from `image`.
    pub fn submit(&mut self, session: &mut ScanSession, image: &Frame) -> FrameOutcome {
        session.fallback_to_still();
        let now_ms = self.clock.now_ms();
        let outcome = session.process_frame(image, &mut self.decoder, self.mode, now_ms);

        match &outcome {
            FrameOutcome::Finished(ScanState::DecodedValid { navigate_to }) => {
                self.navigator.navigate(navigate_to);
            }
            FrameOutcome::NotFound { notice } => {
                tracing::info!(session_id = %session.id(), "{}", notice);
            }
            _ => {}
        }

        outcome
    }
}
