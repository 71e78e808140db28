//! Countdown and capture state machine.
//!
//! The sequencer owns no timers. The caller feeds it the current instant on
//! every tick and it works out which deadlines have passed, so a fake clock
//! is just a different `Instant` passed in.
//!
//! ```text
//! Idle -> Counting(D) -> ... -> Counting(0) -> Flashing -> Settling -> Counting(D) ...
//!                                                      \-> Complete (last frame)
//! ```

use std::time::{Duration, Instant};

use super::errors::CaptureError;
use super::session::CaptureSession;
use crate::frame::Frame;

/// Where the sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled; start is armed
    Idle,
    /// Countdown showing `n`; at 0 the shutter fires
    Counting(u32),
    /// Flash overlay visible after a capture
    Flashing,
    /// Waiting before the next countdown
    Settling,
    /// Every frame captured
    Complete,
}

/// Timing of one capture sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    /// Countdown length, in steps
    pub countdown_secs: u32,
    /// Length of one countdown step
    pub step: Duration,
    /// How long the flash stays up
    pub flash: Duration,
    /// Time from one capture to the next countdown, flash included
    pub settle: Duration,
    /// Delay before retrying a failed capture
    pub retry: Duration,
    /// Consecutive failed captures before the sequence gives up
    pub max_attempts: u32,
    /// Emit a shutter event with every capture
    pub shutter_sound: bool,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            countdown_secs: 1,
            step: Duration::from_secs(1),
            flash: Duration::from_millis(200),
            settle: Duration::from_secs(1),
            retry: Duration::from_millis(250),
            max_attempts: 3,
            shutter_sound: true,
        }
    }
}

/// What happened during a tick, in order. The UI renders from these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerEvent {
    /// Countdown now shows this number
    Countdown(u32),
    /// Flash overlay on
    Flash,
    /// Flash overlay off
    FlashEnded,
    /// Play the shutter sound
    Shutter,
    /// Frame `index` was appended to the session
    Captured { index: usize },
    /// A capture attempt failed; it will be retried unless an `Aborted` follows
    CaptureFailed { attempt: u32, reason: String },
    /// The sequence gave up; captured frames are kept
    Aborted { reason: String },
    /// The session is full
    Completed,
}

/// Drives countdown, flash and capture for one booth session.
#[derive(Debug)]
pub struct CaptureSequencer {
    timing: SequenceTiming,
    phase: Phase,
    deadline: Option<Instant>,
    failed_attempts: u32,
    events: Vec<SequencerEvent>,
}

impl CaptureSequencer {
    pub fn new(timing: SequenceTiming) -> Self {
        Self {
            timing,
            phase: Phase::Idle,
            deadline: None,
            failed_attempts: 0,
            events: Vec::new(),
        }
    }

    /// Begin a sequence at `now`.
    ///
    /// Returns `false` and changes nothing while a sequence is already
    /// running or when the session is complete.
    pub fn start(&mut self, now: Instant, session: &CaptureSession) -> bool {
        if self.is_running() || session.is_complete() {
            log::debug!("Ignoring start in phase {:?}", self.phase);
            return false;
        }
        log::info!(
            "Starting capture sequence: {} frame(s) to go",
            session.remaining()
        );
        self.failed_attempts = 0;
        self.begin_countdown(now);
        true
    }

    /// Process every deadline up to `now`.
    ///
    /// `capture` takes one snapshot at the given instant. A frame only counts
    /// once it has been appended to `session`; failures are retried after
    /// `retry` and abort the sequence after `max_attempts` in a row.
    pub fn advance<F>(
        &mut self,
        now: Instant,
        session: &mut CaptureSession,
        mut capture: F,
    ) -> Vec<SequencerEvent>
    where
        F: FnMut(Instant) -> Result<Frame, CaptureError>,
    {
        while let Some(at) = self.deadline {
            if at > now {
                break;
            }
            match self.phase {
                Phase::Counting(n) if n > 1 => {
                    self.phase = Phase::Counting(n - 1);
                    self.deadline = Some(at + self.timing.step);
                    self.events.push(SequencerEvent::Countdown(n - 1));
                }
                Phase::Counting(n) => {
                    if n == 1 {
                        self.phase = Phase::Counting(0);
                        self.events.push(SequencerEvent::Countdown(0));
                    }
                    self.shoot(at, session, &mut capture);
                }
                Phase::Flashing => {
                    self.events.push(SequencerEvent::FlashEnded);
                    if session.is_complete() {
                        self.phase = Phase::Complete;
                        self.deadline = None;
                        self.events.push(SequencerEvent::Completed);
                        log::info!("Capture sequence complete");
                    } else {
                        self.phase = Phase::Settling;
                        self.deadline =
                            Some(at + self.timing.settle.saturating_sub(self.timing.flash));
                    }
                }
                Phase::Settling => self.begin_countdown(at),
                Phase::Idle | Phase::Complete => self.deadline = None,
            }
        }
        self.take_events()
    }

    /// Drain events queued since the last call.
    pub fn take_events(&mut self) -> Vec<SequencerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop all pending deadlines and UI state.
    pub fn cancel(&mut self) {
        if self.is_running() {
            log::info!("Capture sequence cancelled in phase {:?}", self.phase);
        }
        self.phase = Phase::Idle;
        self.deadline = None;
        self.failed_attempts = 0;
        self.events.clear();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> &SequenceTiming {
        &self.timing
    }

    /// Whether a sequence is in flight (start is disabled).
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            Phase::Counting(_) | Phase::Flashing | Phase::Settling
        )
    }

    /// Number to overlay on the preview, if any.
    pub fn countdown(&self) -> Option<u32> {
        match self.phase {
            Phase::Counting(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_flashing(&self) -> bool {
        self.phase == Phase::Flashing
    }

    fn begin_countdown(&mut self, at: Instant) {
        let n = self.timing.countdown_secs;
        self.phase = Phase::Counting(n);
        self.deadline = Some(if n == 0 { at } else { at + self.timing.step });
        self.events.push(SequencerEvent::Countdown(n));
    }

    fn shoot<F>(&mut self, at: Instant, session: &mut CaptureSession, capture: &mut F)
    where
        F: FnMut(Instant) -> Result<Frame, CaptureError>,
    {
        match capture(at).and_then(|frame| session.push(frame)) {
            Ok(index) => {
                self.failed_attempts = 0;
                self.phase = Phase::Flashing;
                self.deadline = Some(at + self.timing.flash);
                self.events.push(SequencerEvent::Flash);
                if self.timing.shutter_sound {
                    self.events.push(SequencerEvent::Shutter);
                }
                self.events.push(SequencerEvent::Captured { index });
                log::info!("Captured frame {} of {}", index + 1, session.capacity());
            }
            Err(e) => {
                self.failed_attempts += 1;
                let reason = e.to_string();
                log::warn!("Capture attempt {} failed: {}", self.failed_attempts, reason);
                self.events.push(SequencerEvent::CaptureFailed {
                    attempt: self.failed_attempts,
                    reason: reason.clone(),
                });

                let full = matches!(e, CaptureError::SessionFull { .. });
                if full || self.failed_attempts >= self.timing.max_attempts {
                    self.events.push(SequencerEvent::Aborted { reason });
                    self.phase = Phase::Idle;
                    self.deadline = None;
                    self.failed_attempts = 0;
                } else {
                    self.deadline = Some(at + self.timing.retry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame_at(at: Instant) -> Result<Frame, CaptureError> {
        Ok(Frame::encode(&RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])), at)?)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Tick every 50ms from `t0` for `total`, collecting events.
    fn run_ticks(
        sequencer: &mut CaptureSequencer,
        session: &mut CaptureSession,
        t0: Instant,
        total: Duration,
    ) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        let mut elapsed = Duration::ZERO;
        while elapsed <= total {
            events.extend(sequencer.advance(t0 + elapsed, session, frame_at));
            elapsed += Duration::from_millis(50);
        }
        events
    }

    #[test]
    fn test_three_frames_two_seconds_apart() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(3);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());

        assert!(sequencer.start(t0, &session));
        let events = run_ticks(&mut sequencer, &mut session, t0, ms(8000));

        assert_eq!(session.len(), 3);
        let times: Vec<Duration> = session
            .frames()
            .iter()
            .map(|f| f.captured_at() - t0)
            .collect();
        assert_eq!(times, vec![ms(1000), ms(3000), ms(5000)]);
        assert_eq!(sequencer.phase(), Phase::Complete);
        assert_eq!(sequencer.countdown(), None);
        assert!(!sequencer.is_flashing());
        assert_eq!(events.last(), Some(&SequencerEvent::Completed));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SequencerEvent::Captured { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_event_order_for_one_frame() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(1);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);

        let mut events = sequencer.take_events();
        events.extend(sequencer.advance(t0 + ms(1000), &mut session, frame_at));
        assert!(sequencer.is_flashing());
        events.extend(sequencer.advance(t0 + ms(1200), &mut session, frame_at));

        assert_eq!(
            events,
            vec![
                SequencerEvent::Countdown(1),
                SequencerEvent::Countdown(0),
                SequencerEvent::Flash,
                SequencerEvent::Shutter,
                SequencerEvent::Captured { index: 0 },
                SequencerEvent::FlashEnded,
                SequencerEvent::Completed,
            ]
        );
    }

    #[test]
    fn test_second_start_is_noop_while_running() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(3);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        assert!(sequencer.start(t0, &session));
        sequencer.take_events();

        sequencer.advance(t0 + ms(1100), &mut session, frame_at);
        let phase = sequencer.phase();
        assert!(!sequencer.start(t0 + ms(1100), &session));
        assert_eq!(sequencer.phase(), phase);
        assert!(sequencer.take_events().is_empty());

        run_ticks(&mut sequencer, &mut session, t0 + ms(1100), ms(8000));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_start_on_complete_session_is_noop() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(1);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);
        sequencer.advance(t0 + ms(2000), &mut session, frame_at);
        assert_eq!(sequencer.phase(), Phase::Complete);

        assert!(!sequencer.start(t0 + ms(3000), &session));
        assert_eq!(sequencer.phase(), Phase::Complete);
    }

    #[test]
    fn test_coarse_tick_catches_up_on_schedule() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(3);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);

        let events = sequencer.advance(t0 + ms(30000), &mut session, frame_at);
        assert_eq!(events.last(), Some(&SequencerEvent::Completed));
        let times: Vec<Duration> = session
            .frames()
            .iter()
            .map(|f| f.captured_at() - t0)
            .collect();
        assert_eq!(times, vec![ms(1000), ms(3000), ms(5000)]);
    }

    #[test]
    fn test_failed_capture_does_not_count() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(2);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);

        let mut failures_left = 2;
        let mut events = Vec::new();
        let mut elapsed = Duration::ZERO;
        while elapsed <= ms(10000) {
            events.extend(sequencer.advance(t0 + elapsed, &mut session, |at| {
                if failures_left > 0 {
                    failures_left -= 1;
                    Err(CaptureError::SurfaceUnavailable {
                        device: "cam".to_string(),
                    })
                } else {
                    frame_at(at)
                }
            }));
            elapsed += Duration::from_millis(50);
        }

        assert_eq!(session.len(), 2);
        assert_eq!(sequencer.phase(), Phase::Complete);
        let failures: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                SequencerEvent::CaptureFailed { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![1, 2]);
        // Two retries of 250ms push the first frame back by half a second.
        assert_eq!(session.frames()[0].captured_at() - t0, ms(1500));
    }

    #[test]
    fn test_aborts_after_max_attempts_and_keeps_frames() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(3);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);

        // First frame succeeds.
        sequencer.advance(t0 + ms(1000), &mut session, frame_at);
        assert_eq!(session.len(), 1);

        let events = sequencer.advance(t0 + ms(10000), &mut session, |_| {
            Err(CaptureError::NoLiveStream)
        });
        assert_eq!(sequencer.phase(), Phase::Idle);
        assert_eq!(session.len(), 1);
        assert!(matches!(events.last(), Some(SequencerEvent::Aborted { .. })));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SequencerEvent::CaptureFailed { .. }))
                .count(),
            3
        );

        // A new start picks up where the session left off.
        let t1 = t0 + ms(20000);
        assert!(sequencer.start(t1, &session));
        sequencer.advance(t1 + ms(30000), &mut session, frame_at);
        assert_eq!(session.len(), 3);
        assert_eq!(sequencer.phase(), Phase::Complete);
    }

    #[test]
    fn test_longer_countdown_counts_down_each_step() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(1);
        let timing = SequenceTiming {
            countdown_secs: 3,
            shutter_sound: false,
            ..SequenceTiming::default()
        };
        let mut sequencer = CaptureSequencer::new(timing);
        sequencer.start(t0, &session);

        let mut shown = Vec::new();
        for event in run_ticks(&mut sequencer, &mut session, t0, ms(5000)) {
            if let SequencerEvent::Countdown(n) = event {
                shown.push(n);
            }
            assert_ne!(event, SequencerEvent::Shutter);
        }
        assert_eq!(shown, vec![3, 2, 1, 0]);
        assert_eq!(session.frames()[0].captured_at() - t0, ms(3000));
    }

    #[test]
    fn test_zero_countdown_captures_immediately() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(1);
        let timing = SequenceTiming {
            countdown_secs: 0,
            ..SequenceTiming::default()
        };
        let mut sequencer = CaptureSequencer::new(timing);
        sequencer.start(t0, &session);
        sequencer.advance(t0, &mut session, frame_at);
        assert_eq!(session.len(), 1);
        assert!(sequencer.is_flashing());
    }

    #[test]
    fn test_cancel_clears_state() {
        let t0 = Instant::now();
        let mut session = CaptureSession::new(3);
        let mut sequencer = CaptureSequencer::new(SequenceTiming::default());
        sequencer.start(t0, &session);
        sequencer.cancel();

        assert_eq!(sequencer.phase(), Phase::Idle);
        assert!(sequencer.take_events().is_empty());
        assert!(sequencer
            .advance(t0 + ms(10000), &mut session, frame_at)
            .is_empty());
        assert!(session.is_empty());
    }
}
