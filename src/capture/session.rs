//! The frames captured so far in one booth visit.

use super::errors::CaptureError;
use crate::frame::Frame;

/// Ordered frames, at most `capacity` of them.
///
/// Frames are only ever appended; once `capacity` frames are present the
/// session is complete and rejects further frames.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    capacity: usize,
    frames: Vec<Frame>,
}

impl CaptureSession {
    /// An empty session. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Append a frame, returning its index.
    ///
    /// # Errors
    /// * `CaptureError::SessionFull` - If the session is already complete
    pub fn push(&mut self, frame: Frame) -> Result<usize, CaptureError> {
        if self.is_complete() {
            return Err(CaptureError::SessionFull {
                capacity: self.capacity,
            });
        }
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames still to capture.
    pub fn remaining(&self) -> usize {
        self.capacity - self.frames.len()
    }

    pub fn is_complete(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Hand the frames over once the session is complete.
    pub fn completed_frames(&self) -> Option<Vec<Frame>> {
        self.is_complete().then(|| self.frames.clone())
    }
}
