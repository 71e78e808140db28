//! Synthetic cameras that render color bars.
//!
//! Used by `--test-pattern` and by the test suite. A [`TestPatternHandle`]
//! shares state with the provider so callers can hot-plug devices, refuse
//! permission or make snapshots fail while a session is running.

use image::{Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::broadcast;

use super::provider::{CameraProvider, DeviceChange, LiveStream};
use super::types::{
    CameraError, DeviceDescriptor, Resolution, StreamCapabilities, StreamConstraints,
};
use crate::permissions::PermissionState;

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// A fake camera.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPatternDevice {
    pub id: String,
    pub label: String,
    /// Largest size the device can deliver
    pub native: Resolution,
    /// Whether the track reports capabilities (and therefore accepts re-applied constraints)
    pub reports_capabilities: bool,
}

impl TestPatternDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, native: Resolution) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            native,
            reports_capabilities: true,
        }
    }

    pub fn without_capabilities(mut self) -> Self {
        self.reports_capabilities = false;
        self
    }
}

/// Stream lifecycle record, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A stream was opened while `live_before` other streams were still running
    Opened { device: String, live_before: usize },
    Stopped { device: String },
}

struct State {
    devices: Vec<TestPatternDevice>,
    permission: PermissionState,
    deny_requests: bool,
    fail_enumeration: bool,
    failing_snapshots: u32,
    live_streams: usize,
    constraint_updates: usize,
    events: Vec<StreamEvent>,
    changes: broadcast::Sender<DeviceChange>,
}

impl State {
    fn has_device(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id == id)
    }

    fn notify(&self) {
        // No receivers is fine: nobody is watching for hot-plug yet.
        let _ = self.changes.send(DeviceChange);
    }
}

/// Control handle shared with a [`TestPatternProvider`].
#[derive(Clone)]
pub struct TestPatternHandle {
    state: Rc<RefCell<State>>,
}

impl TestPatternHandle {
    /// Connect a device and signal a device change.
    pub fn plug(&self, device: TestPatternDevice) {
        let mut state = self.state.borrow_mut();
        state.devices.retain(|d| d.id != device.id);
        state.devices.push(device);
        state.notify();
    }

    /// Disconnect a device and signal a device change. Open streams on it go dead.
    pub fn unplug(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        state.devices.retain(|d| d.id != id);
        state.notify();
    }

    pub fn grant_permission(&self) {
        let mut state = self.state.borrow_mut();
        state.permission = PermissionState::Granted;
        state.deny_requests = false;
    }

    /// Make the next permission request fail, and revoke current access.
    pub fn deny_permission(&self) {
        let mut state = self.state.borrow_mut();
        state.permission = PermissionState::Denied;
        state.deny_requests = true;
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.borrow_mut().fail_enumeration = fail;
    }

    /// Make the next `count` snapshots come back empty.
    pub fn fail_snapshots(&self, count: u32) {
        self.state.borrow_mut().failing_snapshots = count;
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.state.borrow().events.clone()
    }

    pub fn live_streams(&self) -> usize {
        self.state.borrow().live_streams
    }

    /// How many times constraints were re-applied to a running stream.
    pub fn constraint_updates(&self) -> usize {
        self.state.borrow().constraint_updates
    }
}

/// Provider for synthetic cameras.
pub struct TestPatternProvider {
    state: Rc<RefCell<State>>,
}

impl TestPatternProvider {
    /// Two test-pattern cameras, permission not yet requested.
    pub fn new() -> Self {
        let provider = Self::empty();
        {
            let mut state = provider.state.borrow_mut();
            state.devices.push(TestPatternDevice::new(
                "pattern-0",
                "Test Pattern (1080p)",
                Resolution::FULL_HD,
            ));
            state.devices.push(TestPatternDevice::new(
                "pattern-1",
                "Test Pattern (720p)",
                Resolution::HD,
            ));
        }
        provider
    }

    /// No devices, permission not yet requested.
    pub fn empty() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Rc::new(RefCell::new(State {
                devices: Vec::new(),
                permission: PermissionState::Prompt,
                deny_requests: false,
                fail_enumeration: false,
                failing_snapshots: 0,
                live_streams: 0,
                constraint_updates: 0,
                events: Vec::new(),
                changes,
            })),
        }
    }

    pub fn handle(&self) -> TestPatternHandle {
        TestPatternHandle {
            state: Rc::clone(&self.state),
        }
    }
}

impl Default for TestPatternProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraProvider for TestPatternProvider {
    fn permission_state(&self) -> PermissionState {
        self.state.borrow().permission
    }

    fn request_permission(&mut self) -> Result<(), CameraError> {
        let mut state = self.state.borrow_mut();
        if state.deny_requests {
            state.permission = PermissionState::Denied;
            return Err(CameraError::PermissionDenied);
        }
        state.permission = PermissionState::Granted;
        Ok(())
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, CameraError> {
        let state = self.state.borrow();
        if state.fail_enumeration {
            return Err(CameraError::QueryFailed("test pattern enumeration disabled".to_string()));
        }
        // Labels stay hidden until access is granted.
        let show_labels = state.permission.is_granted();
        Ok(state
            .devices
            .iter()
            .map(|d| {
                let label = if show_labels { d.label.clone() } else { String::new() };
                DeviceDescriptor::new(d.id.clone(), label)
            })
            .collect())
    }

    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn LiveStream>, CameraError> {
        let mut state = self.state.borrow_mut();
        if !state.permission.is_granted() {
            return Err(CameraError::PermissionDenied);
        }

        let device = match constraints.device_id.as_deref() {
            Some(id) => state
                .devices
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| CameraError::DeviceNotFound(id.to_string()))?,
            None => state.devices.first().cloned().ok_or(CameraError::NoDevices)?,
        };

        if !constraints.accepts(device.native) {
            return Err(CameraError::ConstraintsUnsatisfiable(format!(
                "{} is {}, aspect ratio {:.3} required",
                device.id,
                device.native,
                constraints.exact_aspect_ratio.unwrap_or_default()
            )));
        }

        let live_before = state.live_streams;
        state.live_streams += 1;
        state.events.push(StreamEvent::Opened {
            device: device.id.clone(),
            live_before,
        });

        Ok(Box::new(TestPatternStream {
            state: Rc::clone(&self.state),
            resolution: fit(constraints.ideal, device.native),
            device,
            frames: Cell::new(0),
            live: true,
        }))
    }

    fn device_changes(&self) -> Option<broadcast::Receiver<DeviceChange>> {
        Some(self.state.borrow().changes.subscribe())
    }
}

/// The ideal size when the device can deliver it, otherwise the device's own.
fn fit(ideal: Option<Resolution>, native: Resolution) -> Resolution {
    match ideal {
        Some(r) if r.width <= native.width && r.height <= native.height => r,
        _ => native,
    }
}

struct TestPatternStream {
    state: Rc<RefCell<State>>,
    device: TestPatternDevice,
    resolution: Resolution,
    frames: Cell<u32>,
    live: bool,
}

impl LiveStream for TestPatternStream {
    fn device_id(&self) -> &str {
        &self.device.id
    }

    fn resolution(&self) -> Option<Resolution> {
        self.is_live().then_some(self.resolution)
    }

    fn capabilities(&self) -> Option<StreamCapabilities> {
        self.device.reports_capabilities.then_some(StreamCapabilities {
            max_resolution: self.device.native,
        })
    }

    fn apply_constraints(&mut self, constraints: &StreamConstraints) -> Result<(), CameraError> {
        self.state.borrow_mut().constraint_updates += 1;
        if !self.device.reports_capabilities {
            return Err(CameraError::ConstraintsUnsatisfiable(
                "track does not accept constraints".to_string(),
            ));
        }
        if !constraints.accepts(self.device.native) {
            return Err(CameraError::ConstraintsUnsatisfiable(format!(
                "{} cannot change shape",
                self.device.id
            )));
        }
        self.resolution = fit(constraints.ideal, self.device.native);
        Ok(())
    }

    fn snapshot(&self) -> Option<RgbImage> {
        if !self.is_live() {
            return None;
        }
        {
            let mut state = self.state.borrow_mut();
            if state.failing_snapshots > 0 {
                state.failing_snapshots -= 1;
                return None;
            }
        }

        let n = self.frames.get();
        self.frames.set(n.wrapping_add(1));
        Some(render_bars(self.resolution, n))
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        let mut state = self.state.borrow_mut();
        state.live_streams = state.live_streams.saturating_sub(1);
        state.events.push(StreamEvent::Stopped {
            device: self.device.id.clone(),
        });
    }

    fn is_live(&self) -> bool {
        self.live && self.state.borrow().has_device(&self.device.id)
    }
}

impl Drop for TestPatternStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Vertical color bars, rotated one bar per frame so consecutive frames differ.
fn render_bars(resolution: Resolution, frame: u32) -> RgbImage {
    let width = resolution.width.max(1);
    let bar_width = (width / BARS.len() as u32).max(1);
    RgbImage::from_fn(width, resolution.height.max(1), |x, _| {
        let bar = ((x / bar_width) as usize + frame as usize) % BARS.len();
        Rgb(BARS[bar])
    })
}
