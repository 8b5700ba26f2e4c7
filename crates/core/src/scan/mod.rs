//! Doctor-side scanning of patient share links.
//!
//! - [`session`]: the scan state machine shared by both entry points
//! - [`live`]: polling a camera until a terminal state, with guaranteed camera release
//! - [`still`]: one-shot decoding of uploaded images
//! - [`frame`]: pixel frames and the decoder seam

pub mod frame;
pub mod live;
pub mod session;
pub mod still;

pub use frame::{Frame, FrameDecoder, InversionMode, PixelFormat, QrFrameDecoder};
pub use live::{Camera, CameraStream, LiveScanner, StreamGuard};
pub use session::{FrameOutcome, Navigator, ScanSession, ScanState};
pub use still::StillImageScanner;
