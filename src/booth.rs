//! The booth session: everything the capture view owns, in one place.
//!
//! A [`BoothSession`] holds the device list, the single open stream, the
//! frames captured so far and the countdown sequencer. Finishing a sequence
//! produces a [`Handoff`], which the [`ResultsView`] turns into a strip.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::broadcast;

use crate::camera::{
    list_video_input_devices, CameraController, CameraError, CameraProvider, DeviceChange,
    DeviceDescriptor, DeviceEnumerator, SelectionChange,
};
use crate::capture::{capture_frame, CaptureSequencer, CaptureSession, Phase, SequencerEvent};
use crate::config::Config;
use crate::frame::Frame;
use crate::permissions::PermissionNotice;
use crate::strip::{compose, Color, ComposeError, CompositeImage, StripLayout};

/// Which view the booth is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Capture,
    Results,
}

/// Frames passed from the capture view to the results view.
#[derive(Debug, Clone)]
pub struct Handoff {
    pub frames: Vec<Frame>,
}

/// Capture-side state for one visitor.
pub struct BoothSession<P: CameraProvider> {
    provider: P,
    devices: DeviceEnumerator,
    camera: CameraController,
    session: CaptureSession,
    sequencer: CaptureSequencer,
    mirror: bool,
    notice: Option<PermissionNotice>,
    route: Route,
}

impl<P: CameraProvider> BoothSession<P> {
    pub fn new(provider: P, config: &Config) -> Self {
        Self {
            provider,
            devices: DeviceEnumerator::new(config.camera.device.clone()),
            camera: CameraController::new(config.camera.resolution),
            session: CaptureSession::new(config.session.photo_count),
            sequencer: CaptureSequencer::new(config.timing()),
            mirror: config.camera.mirror,
            notice: None,
            route: Route::Capture,
        }
    }

    /// Ask for camera access, list devices and open the selected one.
    ///
    /// On refusal a [`PermissionNotice`] is recorded, the device list is
    /// left empty and nothing is opened.
    ///
    /// # Errors
    /// * `CameraError::PermissionDenied` - If access was refused
    /// * `CameraError::NoDevices` - If no camera is connected
    /// * Any error from opening the stream
    pub fn prepare(&mut self) -> Result<(), CameraError> {
        if let Err(e) = self.provider.request_permission() {
            log::warn!("Camera permission request failed: {}", e);
            self.camera.release();
            self.devices.clear();
            self.notice = Some(PermissionNotice::denied(Some(e.to_string())));
            return Err(e);
        }
        self.notice = None;
        self.devices.refresh(&self.provider);
        self.open_selected()
    }

    /// Re-enumerate after a hot-plug signal and follow the selection.
    ///
    /// Only the capture view holds a stream; elsewhere the list is refreshed
    /// and the camera stays released until [`retake`](Self::retake).
    pub fn on_device_change(&mut self) -> SelectionChange {
        let change = self.devices.refresh(&self.provider);
        if self.route != Route::Capture {
            return change;
        }
        let stream_ok = self.camera.stream().is_some_and(|s| s.is_live())
            && self.camera.active_device() == self.devices.selected_id();
        if change.changed() || !stream_ok {
            if let Err(e) = self.open_selected() {
                log::warn!("No usable camera after device change: {}", e);
            }
        }
        change
    }

    /// Re-enumerate and report whether the list differs from the last one.
    ///
    /// Used when the provider cannot signal changes itself.
    pub fn poll_devices(&mut self) -> bool {
        if self.notice.is_some() {
            return false;
        }
        if list_video_input_devices(&self.provider) == self.devices.devices() {
            return false;
        }
        log::debug!("Device list changed while polling");
        self.on_device_change();
        true
    }

    /// Switch to another camera. The old stream is stopped first.
    pub fn select_camera(&mut self, id: &str) -> Result<(), CameraError> {
        self.devices.select(id)?;
        self.open_selected()
    }

    /// Start the countdown. Returns `false` when it was a no-op.
    ///
    /// The initial countdown event is delivered by the next [`tick`](Self::tick).
    pub fn start_sequence(&mut self, now: Instant) -> bool {
        if self.route != Route::Capture {
            return false;
        }
        self.sequencer.start(now, &self.session)
    }

    /// Advance the sequencer to `now`, capturing from the open stream.
    pub fn tick(&mut self, now: Instant) -> Vec<SequencerEvent> {
        let stream = self.camera.stream();
        let mirror = self.mirror;
        self.sequencer
            .advance(now, &mut self.session, |at| capture_frame(stream, mirror, at))
    }

    /// Leave the capture view with the finished session.
    ///
    /// Returns `None` until the sequence is complete. The stream is released
    /// once the frames are handed off.
    pub fn handoff(&mut self) -> Option<Handoff> {
        if self.sequencer.phase() != Phase::Complete {
            return None;
        }
        let frames = self.session.completed_frames()?;
        self.camera.release();
        self.route = Route::Results;
        log::info!("Handing off {} photo(s)", frames.len());
        Some(Handoff { frames })
    }

    /// Discard the session and go back to capture with the camera reopened.
    pub fn retake(&mut self) -> Result<(), CameraError> {
        self.sequencer.cancel();
        self.session = CaptureSession::new(self.session.capacity());
        self.route = Route::Capture;
        self.open_selected()
    }

    /// Clear pending deadlines and release the camera.
    pub fn teardown(&mut self) {
        self.sequencer.cancel();
        self.camera.release();
    }

    pub fn device_changes(&self) -> Option<broadcast::Receiver<DeviceChange>> {
        self.provider.device_changes()
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        self.devices.devices()
    }

    pub fn selected_device(&self) -> Option<&DeviceDescriptor> {
        self.devices.selected()
    }

    pub fn notice(&self) -> Option<&PermissionNotice> {
        self.notice.as_ref()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn sequencer(&self) -> &CaptureSequencer {
        &self.sequencer
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn route(&self) -> Route {
        self.route
    }

    fn open_selected(&mut self) -> Result<(), CameraError> {
        let Some(id) = self.devices.selected_id().map(str::to_string) else {
            self.camera.release();
            return Err(CameraError::NoDevices);
        };
        let result = self.camera.open(&mut self.provider, &id);
        if let Err(CameraError::PermissionDenied) = result {
            self.devices.clear();
            self.notice = Some(PermissionNotice::denied(None));
        }
        result
    }
}

impl<P: CameraProvider> Drop for BoothSession<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Sent back to capture instead of showing results.
#[derive(Debug, thiserror::Error)]
#[error("Nothing to show yet: {reason}")]
pub struct Redirect {
    pub to: Route,
    #[source]
    pub reason: ComposeError,
}

/// The strip preview with its background picker.
#[derive(Debug)]
pub struct ResultsView {
    frames: Vec<Frame>,
    layout: StripLayout,
    background: Color,
    composite: CompositeImage,
}

impl ResultsView {
    /// Build the preview from a handoff.
    ///
    /// A missing handoff or one with the wrong number of frames redirects
    /// to capture; no partial strip is produced.
    pub fn open(
        handoff: Option<Handoff>,
        layout: StripLayout,
        background: Color,
    ) -> Result<Self, Redirect> {
        let frames = handoff.map(|h| h.frames).unwrap_or_default();
        match compose(&frames, background, &layout) {
            Ok(composite) => Ok(Self {
                frames,
                layout,
                background,
                composite,
            }),
            Err(reason) => {
                log::warn!("Redirecting to capture: {}", reason);
                Err(Redirect {
                    to: Route::Capture,
                    reason,
                })
            }
        }
    }

    /// Recompose on a new background.
    pub fn set_background(&mut self, background: Color) -> Result<(), ComposeError> {
        if background == self.background {
            return Ok(());
        }
        self.composite = compose(&self.frames, background, &self.layout)?;
        self.background = background;
        Ok(())
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn composite(&self) -> &CompositeImage {
        &self.composite
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn download(&self, dir: &Path) -> Result<PathBuf, ComposeError> {
        self.composite.download(dir)
    }

    /// Throw the photos away and go back to capture.
    pub fn retake(self) -> Route {
        log::info!("Retake requested, discarding {} photo(s)", self.frames.len());
        Route::Capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::test_pattern::StreamEvent;
    use crate::camera::{Resolution, TestPatternDevice, TestPatternProvider};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.camera.resolution = Resolution::new(32, 18);
        config.strip.width = 60;
        config.strip.height = 120;
        config.strip.padding = 4;
        config.strip.gap = 4;
        config
    }

    fn small_provider() -> TestPatternProvider {
        let provider = TestPatternProvider::empty();
        let handle = provider.handle();
        handle.plug(TestPatternDevice::new("a", "Front", Resolution::new(32, 18)));
        handle.plug(TestPatternDevice::new("b", "Back", Resolution::new(64, 36)));
        provider
    }

    fn run_to_completion(booth: &mut BoothSession<TestPatternProvider>, t0: Instant) {
        assert!(booth.start_sequence(t0));
        let mut t = t0;
        while booth.sequencer().phase() != Phase::Complete {
            t += ms(100);
            booth.tick(t);
            assert!(t < t0 + Duration::from_secs(30), "sequence never completed");
        }
    }

    #[test]
    fn test_prepare_opens_first_device() {
        let mut booth = BoothSession::new(small_provider(), &small_config());
        booth.prepare().unwrap();
        assert_eq!(booth.devices().len(), 2);
        assert_eq!(booth.selected_device().unwrap().label, "Front");
        assert_eq!(booth.camera().active_device(), Some("a"));
        assert!(booth.notice().is_none());
    }

    #[test]
    fn test_permission_denied_leaves_notice_and_no_devices() {
        let provider = small_provider();
        let handle = provider.handle();
        handle.deny_permission();

        let mut booth = BoothSession::new(provider, &small_config());
        assert!(matches!(booth.prepare(), Err(CameraError::PermissionDenied)));
        assert!(booth.devices().is_empty());
        assert!(!booth.camera().is_open());
        let notice = booth.notice().unwrap().to_string();
        assert!(notice.contains("Camera permission is required"));
        assert_eq!(handle.live_streams(), 0);
    }

    #[test]
    fn test_no_devices_is_reported() {
        let mut booth = BoothSession::new(TestPatternProvider::empty(), &small_config());
        assert!(matches!(booth.prepare(), Err(CameraError::NoDevices)));
        assert!(booth.selected_device().is_none());
    }

    #[test]
    fn test_select_camera_stops_previous_stream_first() {
        let provider = small_provider();
        let handle = provider.handle();
        let mut booth = BoothSession::new(provider, &small_config());
        booth.prepare().unwrap();
        booth.select_camera("b").unwrap();

        assert_eq!(booth.camera().active_device(), Some("b"));
        assert_eq!(handle.live_streams(), 1);
        let events = handle.events();
        assert_eq!(
            &events[events.len() - 2..],
            &[
                StreamEvent::Stopped { device: "a".to_string() },
                StreamEvent::Opened { device: "b".to_string(), live_before: 0 },
            ]
        );
        assert!(booth.select_camera("missing").is_err());
    }

    #[test]
    fn test_unplugging_selected_device_falls_back() {
        let provider = small_provider();
        let handle = provider.handle();
        let mut booth = BoothSession::new(provider, &small_config());
        booth.prepare().unwrap();

        handle.unplug("a");
        let change = booth.on_device_change();
        assert!(change.changed());
        assert_eq!(booth.camera().active_device(), Some("b"));

        handle.unplug("b");
        booth.on_device_change();
        assert!(booth.selected_device().is_none());
        assert!(!booth.camera().is_open());
        assert_eq!(handle.live_streams(), 0);
    }

    #[test]
    fn test_poll_detects_new_device() {
        let provider = TestPatternProvider::empty();
        let handle = provider.handle();
        let mut booth = BoothSession::new(provider, &small_config());
        assert!(booth.prepare().is_err());

        assert!(!booth.poll_devices());
        handle.plug(TestPatternDevice::new("c", "USB", Resolution::new(32, 18)));
        assert!(booth.poll_devices());
        assert_eq!(booth.camera().active_device(), Some("c"));
    }

    #[test]
    fn test_full_sequence_hands_off_in_order() {
        let mut booth = BoothSession::new(small_provider(), &small_config());
        booth.prepare().unwrap();
        let t0 = Instant::now();
        assert!(booth.handoff().is_none());
        run_to_completion(&mut booth, t0);

        let handoff = booth.handoff().unwrap();
        assert_eq!(handoff.frames.len(), 3);
        assert!(handoff
            .frames
            .windows(2)
            .all(|w| w[0].captured_at() < w[1].captured_at()));
        assert_eq!(booth.route(), Route::Results);
        assert!(!booth.camera().is_open());
        assert!(!booth.start_sequence(t0));
    }

    #[test]
    fn test_retake_resets_session_and_reopens_camera() {
        let mut booth = BoothSession::new(small_provider(), &small_config());
        booth.prepare().unwrap();
        run_to_completion(&mut booth, Instant::now());
        booth.handoff().unwrap();

        booth.retake().unwrap();
        assert_eq!(booth.route(), Route::Capture);
        assert!(booth.session().is_empty());
        assert_eq!(booth.sequencer().phase(), Phase::Idle);
        assert!(booth.camera().is_open());
    }

    #[test]
    fn test_hot_plug_after_handoff_keeps_camera_released() {
        let provider = small_provider();
        let handle = provider.handle();
        let mut booth = BoothSession::new(provider, &small_config());
        booth.prepare().unwrap();
        run_to_completion(&mut booth, Instant::now());
        booth.handoff().unwrap();
        assert_eq!(handle.live_streams(), 0);

        handle.plug(TestPatternDevice::new("c", "USB", Resolution::new(32, 18)));
        booth.on_device_change();
        assert_eq!(booth.devices().len(), 3);

        handle.unplug("c");
        assert!(booth.poll_devices());

        assert_eq!(booth.route(), Route::Results);
        assert!(!booth.camera().is_open());
        assert_eq!(handle.live_streams(), 0);

        booth.retake().unwrap();
        assert_eq!(handle.live_streams(), 1);
    }

    #[test]
    fn test_drop_releases_stream() {
        let provider = small_provider();
        let handle = provider.handle();
        {
            let mut booth = BoothSession::new(provider, &small_config());
            booth.prepare().unwrap();
            booth.start_sequence(Instant::now());
            assert_eq!(handle.live_streams(), 1);
        }
        assert_eq!(handle.live_streams(), 0);
    }

    #[test]
    fn test_results_view_redirects_without_frames() {
        let layout = small_config().layout();
        let redirect = ResultsView::open(None, layout, Color::WHITE).unwrap_err();
        assert_eq!(redirect.to, Route::Capture);
        assert!(matches!(
            redirect.reason,
            ComposeError::IncompleteSession { expected: 3, actual: 0 }
        ));
    }

    #[test]
    fn test_results_view_recomposes_on_background_change() {
        let config = small_config();
        let mut booth = BoothSession::new(small_provider(), &config);
        booth.prepare().unwrap();
        run_to_completion(&mut booth, Instant::now());

        let mut view =
            ResultsView::open(booth.handoff(), config.layout(), Color::WHITE).unwrap();
        assert_eq!(view.composite().image().get_pixel(0, 0), &Color::WHITE.to_rgba());

        view.set_background(Color::BLACK).unwrap();
        assert_eq!(view.background(), Color::BLACK);
        assert_eq!(view.composite().image().get_pixel(0, 0), &Color::BLACK.to_rgba());

        let dir = tempfile::tempdir().unwrap();
        let saved = view.download(dir.path()).unwrap();
        assert!(saved.ends_with("photo-strip.png"));
        assert_eq!(view.retake(), Route::Capture);
    }
}
