//! Async event loop driving a capture sequence to its handoff.
//!
//! One periodic tick feeds the sequencer; device changes arrive either over
//! the provider's broadcast channel or, for providers without one, from a
//! slower poll of the device list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::booth::{BoothSession, Handoff};
use crate::camera::{CameraProvider, DeviceChange};
use crate::capture::{Phase, SequencerEvent};

/// How often the sequencer is advanced.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How often the device list is re-read when the provider cannot signal changes.
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pause between the last flash and leaving the capture view.
pub const HANDOFF_DELAY: Duration = Duration::from_secs(1);

/// Ways a capture run can end without a handoff.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("No camera available. Connect a camera or run with --test-pattern")]
    NoCamera,
    #[error("Capture sequence stopped: {0}")]
    Aborted(String),
    #[error("Capture sequence could not be started")]
    NotStarted,
    #[error("Interrupted")]
    Interrupted,
}

/// Run one capture sequence until the session is handed off.
///
/// `on_event` sees every sequencer event in order, which is where the
/// countdown, flash and shutter are rendered. The loop stops early when
/// `shutdown` is set, tearing the booth down (deadlines cleared, stream
/// released).
pub async fn run_capture<P, F>(
    booth: &mut BoothSession<P>,
    shutdown: &AtomicBool,
    mut on_event: F,
) -> Result<Handoff, LoopError>
where
    P: CameraProvider,
    F: FnMut(&SequencerEvent),
{
    if !booth.camera().is_open() {
        return Err(LoopError::NoCamera);
    }

    let mut changes = booth.device_changes();

    let mut tick = time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut poll = time::interval(DEVICE_POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if !booth.start_sequence(Instant::now().into_std()) {
        // A finished session is handed off as is; a running one is carried on.
        if booth.sequencer().phase() == Phase::Complete {
            log::info!("Session already complete, handing off");
            return booth.handoff().ok_or(LoopError::NotStarted);
        }
        if !booth.sequencer().is_running() {
            return Err(LoopError::NotStarted);
        }
    }
    let mut completed_at: Option<std::time::Instant> = None;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("Shutdown requested, releasing camera");
            booth.teardown();
            return Err(LoopError::Interrupted);
        }

        tokio::select! {
            _ = tick.tick() => {
                let now = Instant::now().into_std();
                for event in booth.tick(now) {
                    on_event(&event);
                    match event {
                        SequencerEvent::Aborted { reason } => return Err(LoopError::Aborted(reason)),
                        SequencerEvent::Completed => completed_at = Some(now),
                        _ => {}
                    }
                }
                if let Some(done) = completed_at {
                    if now >= done + HANDOFF_DELAY {
                        if let Some(handoff) = booth.handoff() {
                            return Ok(handoff);
                        }
                    }
                }
            }

            change = next_change(&mut changes) => {
                match change {
                    Ok(DeviceChange) | Err(RecvError::Lagged(_)) => {
                        booth.on_device_change();
                    }
                    Err(RecvError::Closed) => {
                        log::debug!("Device change channel closed, polling instead");
                        changes = None;
                    }
                }
            }

            _ = poll.tick(), if changes.is_none() => {
                booth.poll_devices();
            }
        }
    }
}

async fn next_change(
    changes: &mut Option<broadcast::Receiver<DeviceChange>>,
) -> Result<DeviceChange, RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// The flag set by the Ctrl+C handler, for passing to [`run_capture`].
pub fn shutdown_flag() -> &'static AtomicBool {
    &CTRLC_RECEIVED
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}
