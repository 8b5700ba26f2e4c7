//! Live camera scanning.
//!
//! The driver polls the camera on a fixed interval, one synchronous capture → decode → branch per
//! tick, and stops as soon as the session is terminal. The camera stream lives inside a
//! [`StreamGuard`]: it is stopped exactly once whether the scan finishes, fails, or the future
//! running [`LiveScanner::run`] is dropped because the user navigated away.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::error::ScanError;
use crate::scan::frame::{Frame, FrameDecoder, InversionMode};
use crate::scan::session::{FrameOutcome, Navigator, ScanSession, ScanState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Source of camera streams.
pub trait Camera {
    type Stream: CameraStream;

    /// Ask for the camera.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::CameraUnavailable`] when permission is refused or no device exists.
    fn acquire(&mut self) -> Result<Self::Stream, ScanError>;
}

/// An open camera stream.
pub trait CameraStream {
    /// Current frame, or `None` if the device has nothing new yet.
    fn capture(&mut self) -> Option<Frame>;

    /// Release the device.
    fn stop(&mut self);
}

/// Owns a camera stream and stops it exactly once.
#[derive(Debug)]
pub struct StreamGuard<S: CameraStream> {
    stream: S,
    stopped: bool,
}

impl<S: CameraStream> StreamGuard<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            stopped: false,
        }
    }

    pub fn capture(&mut self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        self.stream.capture()
    }

    /// Stop the stream. Later calls, including the one from `Drop`, do nothing.
    pub fn release(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stream.stop();
        }
    }
}

impl<S: CameraStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drives a live [`ScanSession`] from a camera.
pub struct LiveScanner<C, D, N> {
    camera: C,
    decoder: D,
    navigator: N,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mode: InversionMode,
}

impl<C, D, N> LiveScanner<C, D, N>
where
    C: Camera,
    D: FrameDecoder,
    N: Navigator,
{
    pub fn new(
        camera: C,
        decoder: D,
        navigator: N,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            camera,
            decoder,
            navigator,
            clock,
            interval,
            mode: InversionMode::default(),
        }
    }

    /// Scanner polling at the configured scan interval.
    pub fn from_config(
        cfg: &CoreConfig,
        camera: C,
        decoder: D,
        navigator: N,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(camera, decoder, navigator, clock, cfg.scan_interval())
    }

    pub fn with_inversion(mut self, mode: InversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `session` until it reaches a terminal state and return that state.
    ///
    /// A session that is not `AcquiringCamera` on entry is returned untouched and the camera is
    /// never requested. Dropping the returned future stops the camera.
    pub async fn run(&mut self, session: &mut ScanSession) -> ScanState {
        if *session.state() != ScanState::AcquiringCamera {
            return session.state().clone();
        }

        let stream = match self.camera.acquire() {
            Ok(stream) => stream,
            Err(err) => {
                session.camera_denied(&err.to_string());
                return session.state().clone();
            }
        };
        let mut guard = StreamGuard::new(stream);
        session.camera_acquired();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !session.is_terminal() {
            ticker.tick().await;

            let Some(frame) = guard.capture() else {
                continue;
            };

            let now_ms = self.clock.now_ms();
            if let FrameOutcome::Finished(ScanState::DecodedValid { navigate_to }) =
                session.process_frame(&frame, &mut self.decoder, self.mode, now_ms)
            {
                self.navigator.navigate(&navigate_to);
            }
        }

        guard.release();
        session.state().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CoreConfig;
    use crate::render::render_frame;
    use crate::scan::frame::{PixelFormat, QrFrameDecoder};
    use crate::token::TokenValidator;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        captured: AtomicUsize,
        stopped: AtomicUsize,
    }

    struct FakeCamera {
        frames: Arc<Mutex<VecDeque<Option<Frame>>>>,
        deny: bool,
        counters: Arc<Counters>,
    }

    struct FakeStream {
        frames: Arc<Mutex<VecDeque<Option<Frame>>>>,
        counters: Arc<Counters>,
    }

    impl Camera for FakeCamera {
        type Stream = FakeStream;

        fn acquire(&mut self) -> Result<FakeStream, ScanError> {
            if self.deny {
                return Err(ScanError::CameraUnavailable("NotAllowedError".into()));
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(FakeStream {
                frames: self.frames.clone(),
                counters: self.counters.clone(),
            })
        }
    }

    impl CameraStream for FakeStream {
        fn capture(&mut self) -> Option<Frame> {
            self.counters.captured.fetch_add(1, Ordering::SeqCst);
            self.frames.lock().unwrap().pop_front().flatten()
        }

        fn stop(&mut self) {
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingNavigator(Vec<String>);

    impl Navigator for RecordingNavigator {
        fn navigate(&mut self, path: &str) {
            self.0.push(path.to_owned());
        }
    }

    struct CountingDecoder {
        inner: QrFrameDecoder,
        calls: Arc<AtomicUsize>,
    }

    impl FrameDecoder for CountingDecoder {
        fn decode(&mut self, frame: &Frame, mode: InversionMode) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(frame, mode)
        }
    }

    fn blank() -> Frame {
        Frame::new(48, 48, PixelFormat::Luma8, vec![255; 48 * 48]).unwrap()
    }

    fn code(payload: &str) -> Frame {
        render_frame(payload, 4, false).unwrap()
    }

    fn setup(
        frames: Vec<Option<Frame>>,
        deny: bool,
        now_ms: i64,
    ) -> (
        LiveScanner<FakeCamera, CountingDecoder, RecordingNavigator>,
        Arc<Counters>,
        Arc<AtomicUsize>,
    ) {
        let counters = Arc::new(Counters::default());
        let decode_calls = Arc::new(AtomicUsize::new(0));
        let camera = FakeCamera {
            frames: Arc::new(Mutex::new(frames.into())),
            deny,
            counters: counters.clone(),
        };
        let decoder = CountingDecoder {
            inner: QrFrameDecoder,
            calls: decode_calls.clone(),
        };
        let scanner = LiveScanner::new(
            camera,
            decoder,
            RecordingNavigator::default(),
            Arc::new(ManualClock::new(now_ms)),
            Duration::from_millis(33),
        );
        (scanner, counters, decode_calls)
    }

    fn session() -> ScanSession {
        ScanSession::live(TokenValidator::new(&CoreConfig::default()))
    }

    const LINK: &str = "http://localhost:3000/patient/profile/abc?ts=1000000";

    #[tokio::test(start_paused = true)]
    async fn valid_code_navigates_once_and_releases_camera() {
        let frames = vec![None, Some(blank()), Some(code(LINK)), Some(code(LINK))];
        let (mut scanner, counters, decode_calls) = setup(frames, false, 1_050_000);
        let mut session = session();

        let state = scanner.run(&mut session).await;

        assert_eq!(
            state,
            ScanState::DecodedValid {
                navigate_to: "/patient/profile/abc".into()
            }
        );
        assert_eq!(scanner.navigator().0, vec!["/patient/profile/abc".to_string()]);
        assert_eq!(decode_calls.load(Ordering::SeqCst), 2);
        assert_eq!(counters.captured.load(Ordering::SeqCst), 3);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_code_is_terminal_without_navigation() {
        let (mut scanner, counters, _) = setup(vec![Some(code(LINK))], false, 1_130_000);
        let mut session = session();

        let state = scanner.run(&mut session).await;

        assert_eq!(state.name(), "decoded_expired");
        assert!(scanner.navigator().0.is_empty());
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn camera_denied_never_decodes_or_releases() {
        let (mut scanner, counters, decode_calls) = setup(vec![Some(code(LINK))], true, 1_000_000);
        let mut session = session();

        let state = scanner.run(&mut session).await;

        assert_eq!(state.name(), "camera_unavailable");
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 0);
        assert_eq!(decode_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rerunning_a_finished_session_is_a_no_op() {
        let (mut scanner, counters, decode_calls) =
            setup(vec![Some(code(LINK)), Some(code(LINK))], false, 1_000_000);
        let mut session = session();

        let first = scanner.run(&mut session).await;
        let second = scanner.run(&mut session).await;

        assert_eq!(first, second);
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(decode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(scanner.navigator().0.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scan_releases_camera_once() {
        let frames = (0..1_000).map(|_| Some(blank())).collect();
        let (mut scanner, counters, _) = setup(frames, false, 1_000_000);
        let mut session = session();

        let result =
            tokio::time::timeout(Duration::from_millis(500), scanner.run(&mut session)).await;

        assert!(result.is_err());
        assert_eq!(session.state(), &ScanState::Scanning);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert!(scanner.navigator().0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_configured_interval() {
        let cfg = CoreConfig::new(
            "http://localhost:3000",
            true,
            30_000,
            false,
            Duration::from_millis(100),
        )
        .unwrap();
        let counters = Arc::new(Counters::default());
        let camera = FakeCamera {
            frames: Arc::new(Mutex::new(vec![None, None, Some(code(LINK))].into())),
            deny: false,
            counters: counters.clone(),
        };
        let mut scanner = LiveScanner::from_config(
            &cfg,
            camera,
            QrFrameDecoder,
            RecordingNavigator::default(),
            Arc::new(ManualClock::new(1_010_000)),
        );
        assert_eq!(scanner.interval(), Duration::from_millis(100));

        let started = tokio::time::Instant::now();
        let state = scanner.run(&mut session()).await;
        let elapsed = started.elapsed();

        assert_eq!(state.name(), "decoded_valid");
        assert_eq!(counters.captured.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
    }

    #[test]
    fn guard_releases_once() {
        let counters = Arc::new(Counters::default());
        let stream = FakeStream {
            frames: Arc::new(Mutex::new(VecDeque::new())),
            counters: counters.clone(),
        };
        {
            let mut guard = StreamGuard::new(stream);
            guard.release();
            guard.release();
            assert!(guard.capture().is_none());
        }
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(counters.captured.load(Ordering::SeqCst), 0);
    }
}
