//! Real webcams through nokhwa.
//!
//! nokhwa cameras are not `Send`-friendly across platforms, so each stream
//! opens its camera inside a background thread that keeps the latest frame
//! in a shared buffer. `snapshot()` reads that buffer; `stop()` signals the
//! thread and joins it.

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::provider::{CameraProvider, LiveStream};
use super::types::{
    CameraError, DeviceDescriptor, Resolution, StreamCapabilities, StreamConstraints,
};
use crate::permissions::PermissionState;

const PERMISSION_TIMEOUT: Duration = Duration::from_secs(30);
const TARGET_FPS: u32 = 30;

/// Provider backed by the platform's native camera API.
#[derive(Debug, Default)]
pub struct NativeProvider {
    permission: Option<bool>,
}

impl NativeProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraProvider for NativeProvider {
    fn permission_state(&self) -> PermissionState {
        match self.permission {
            Some(true) => PermissionState::Granted,
            Some(false) => PermissionState::Denied,
            None if nokhwa::nokhwa_check() => PermissionState::Granted,
            None => PermissionState::Prompt,
        }
    }

    fn request_permission(&mut self) -> Result<(), CameraError> {
        let (tx, rx) = mpsc::channel();
        nokhwa::nokhwa_initialize(move |granted| {
            let _ = tx.send(granted);
        });
        let granted = rx.recv_timeout(PERMISSION_TIMEOUT).unwrap_or(false);
        self.permission = Some(granted);
        if granted {
            Ok(())
        } else {
            Err(CameraError::PermissionDenied)
        }
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, CameraError> {
        let devices =
            nokhwa::query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

        Ok(devices
            .into_iter()
            .enumerate()
            .map(|(position, d)| {
                let index = d.index().as_index().unwrap_or(position as u32);
                DeviceDescriptor::new(index.to_string(), d.human_name())
            })
            .collect())
    }

    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn LiveStream>, CameraError> {
        if self.permission == Some(false) {
            return Err(CameraError::PermissionDenied);
        }
        let device_id = constraints.device_id.clone().unwrap_or_else(|| "0".to_string());
        let index: u32 = device_id
            .parse()
            .map_err(|_| CameraError::DeviceNotFound(device_id.clone()))?;

        let mut stream = NativeStream::start(device_id, index, constraints.ideal)?;
        let actual = stream.resolution;
        if !constraints.accepts(actual) {
            stream.stop();
            return Err(CameraError::ConstraintsUnsatisfiable(format!(
                "device delivers {}",
                actual
            )));
        }
        Ok(Box::new(stream))
    }
}

struct NativeStream {
    device_id: String,
    resolution: Resolution,
    frame_buffer: Arc<Mutex<Option<RgbImage>>>,
    stop_signal: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
}

impl NativeStream {
    fn start(device_id: String, index: u32, ideal: Option<Resolution>) -> Result<Self, CameraError> {
        let frame_buffer = Arc::new(Mutex::new(None));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (info_tx, info_rx) = mpsc::channel::<Result<Resolution, CameraError>>();

        let buffer = Arc::clone(&frame_buffer);
        let stop = Arc::clone(&stop_signal);
        let handle = thread::spawn(move || {
            run_capture_loop(index, ideal, buffer, stop, info_tx);
        });

        match info_rx.recv() {
            Ok(Ok(resolution)) => Ok(Self {
                device_id,
                resolution,
                frame_buffer,
                stop_signal,
                capture_thread: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraError::StreamFailed(
                    "Capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }
}

impl LiveStream for NativeStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn resolution(&self) -> Option<Resolution> {
        Some(self.resolution)
    }

    // The format is negotiated once when the camera opens; the running
    // track cannot be reconfigured.
    fn capabilities(&self) -> Option<StreamCapabilities> {
        None
    }

    fn apply_constraints(&mut self, _constraints: &StreamConstraints) -> Result<(), CameraError> {
        Err(CameraError::ConstraintsUnsatisfiable(
            "native streams cannot be reconfigured while running".to_string(),
        ))
    }

    fn snapshot(&self) -> Option<RgbImage> {
        if !self.is_live() {
            return None;
        }
        let buffer = self.frame_buffer.lock().ok()?;
        buffer.clone()
    }

    fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }

    fn is_live(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture_loop(
    index: u32,
    ideal: Option<Resolution>,
    buffer: Arc<Mutex<Option<RgbImage>>>,
    stop: Arc<AtomicBool>,
    info_tx: mpsc::Sender<Result<Resolution, CameraError>>,
) {
    let index = CameraIndex::Index(index);
    let mut camera = match open_camera_with_fallback(&index, ideal) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = info_tx.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    let res = camera.resolution();
    let _ = info_tx.send(Ok(Resolution::new(res.width(), res.height())));

    while !stop.load(Ordering::Relaxed) {
        if let Ok(raw) = camera.frame() {
            let resolution = raw.resolution();
            // Undecodable frames are dropped; the next one replaces them.
            if let Ok(decoded) = raw.decode_image::<RgbFormat>() {
                if let Some(image) =
                    RgbImage::from_raw(resolution.width(), resolution.height(), decoded.into_raw())
                {
                    if let Ok(mut buf) = buffer.lock() {
                        *buf = Some(image);
                    }
                }
            }
        }
        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

/// Try the requested size in common formats, then whatever the camera offers.
fn open_camera_with_fallback(
    index: &CameraIndex,
    ideal: Option<Resolution>,
) -> Result<Camera, CameraError> {
    let mut attempts = Vec::new();
    if let Some(ideal) = ideal {
        let size = nokhwa::utils::Resolution::new(ideal.width, ideal.height);
        for format in [FrameFormat::NV12, FrameFormat::MJPEG] {
            attempts.push(RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(size, format, TARGET_FPS),
            )));
        }
    }
    attempts.push(RequestedFormat::new::<RgbFormat>(
        RequestedFormatType::AbsoluteHighestResolution,
    ));

    let mut last_error = None;
    for requested in attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = Some(e),
        }
    }

    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no formats to try".to_string());
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("authorization") {
        Err(CameraError::PermissionDenied)
    } else {
        Err(CameraError::OpenFailed(message))
    }
}
