//! Frame capture: the session being filled, the countdown state machine,
//! and the snapshot operation that reads the live stream.

mod errors;
mod sequencer;
mod session;
mod snapshot;

pub use errors::CaptureError;
pub use sequencer::{CaptureSequencer, Phase, SequenceTiming, SequencerEvent};
pub use session::CaptureSession;
pub use snapshot::capture_frame;
