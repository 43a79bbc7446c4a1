//! Tracking session: owns the frame source and the frame counter.
//!
//! ```text
//! Idle --start()--> Active --next_record()--> Active
//!                     |
//!                     +--stop() / drop / run() exit--> Ended (terminal)
//! ```
//!
//! The source is opened by `start` and closed exactly once, by whichever of
//! `stop`, `run` returning, or `Drop` comes first.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{ConfigError, TrackerConfig};
use crate::pipeline::process_frame;
use crate::source::{FrameSource, SourceError};
use crate::MetricsRecord;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, source not yet opened.
    Idle,
    /// Source open, frames may be processed.
    Active,
    /// Source released. Terminal.
    Ended,
}

/// Hard errors of the session API. Per-frame problems are never errors.
#[derive(Debug)]
pub enum SessionError {
    /// Configuration rejected at session creation.
    Config(ConfigError),
    /// The frame source could not be opened.
    Source(SourceError),
    /// Frames were requested before `start`.
    NotActive,
    /// The session has ended; a new one is needed.
    Ended,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Source(e) => write!(f, "hardware unavailable: {e}"),
            Self::NotActive => write!(f, "session has not been started"),
            Self::Ended => write!(f, "session has ended"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::NotActive | Self::Ended => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SourceError> for SessionError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

/// Result of one `next_record` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// A frame was captured and measured.
    Record(MetricsRecord),
    /// No usable frame was delivered. The counter is unchanged and the
    /// caller decides whether to keep going.
    CaptureFailed,
}

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation flag was raised.
    Cancelled,
    /// The source failed to deliver a frame.
    CaptureFailed,
    /// The record callback asked to stop.
    Requested,
}

/// One tracking session over an exclusively owned frame source.
pub struct Session<S: FrameSource> {
    source: S,
    config: TrackerConfig,
    state: SessionState,
    frame_index: u64,
}

impl<S: FrameSource> Session<S> {
    /// Create an idle session. The configuration is validated here.
    pub fn new(source: S, config: TrackerConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            state: SessionState::Idle,
            frame_index: 0,
        })
    }

    /// Create and start a session in one step.
    pub fn open(source: S, config: TrackerConfig) -> Result<Self, SessionError> {
        let mut session = Self::new(source, config)?;
        session.start()?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Index of the last record emitted (0 before the first frame).
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Open the frame source and reset the frame counter.
    ///
    /// On failure the session stays idle and the error is returned as-is;
    /// retry policy belongs to the caller. Starting an active session is a
    /// no-op.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => return Ok(()),
            SessionState::Ended => return Err(SessionError::Ended),
            SessionState::Idle => {}
        }
        self.source.open()?;
        self.frame_index = 0;
        self.state = SessionState::Active;
        let [w, h] = self.config.resolution;
        tracing::info!("session started ({}x{} @ {} fps)", w, h, self.config.fps);
        Ok(())
    }

    /// Capture and measure the next frame.
    pub fn next_record(&mut self) -> Result<FrameOutcome, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NotActive),
            SessionState::Ended => return Err(SessionError::Ended),
            SessionState::Active => {}
        }

        let Some(frame) = self.source.capture() else {
            tracing::warn!("frame capture failed after frame {}", self.frame_index);
            return Ok(FrameOutcome::CaptureFailed);
        };
        let expected = (self.config.width(), self.config.height());
        if frame.dimensions() != expected {
            tracing::warn!(
                "dropping {}x{} frame, expected {}x{}",
                frame.width(),
                frame.height(),
                expected.0,
                expected.1
            );
            return Ok(FrameOutcome::CaptureFailed);
        }

        let decision = process_frame(&frame, &self.config);
        self.frame_index += 1;
        Ok(FrameOutcome::Record(MetricsRecord::new(
            self.frame_index,
            decision,
        )))
    }

    /// Release the frame source. Idempotent; an idle session moves straight
    /// to `Ended` without touching the source.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Ended => {}
            SessionState::Idle => self.state = SessionState::Ended,
            SessionState::Active => {
                self.source.close();
                self.state = SessionState::Ended;
                tracing::info!("session stopped after {} frames", self.frame_index);
            }
        }
    }

    /// Process frames until cancelled, a capture fails, or `on_record`
    /// breaks. The session is stopped before returning.
    ///
    /// `cancel` is checked between frames only.
    pub fn run<F>(&mut self, cancel: &AtomicBool, mut on_record: F) -> Result<StopReason, SessionError>
    where
        F: FnMut(&MetricsRecord) -> ControlFlow<()>,
    {
        let reason = loop {
            if cancel.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            match self.next_record() {
                Ok(FrameOutcome::Record(record)) => {
                    if on_record(&record).is_break() {
                        break StopReason::Requested;
                    }
                }
                Ok(FrameOutcome::CaptureFailed) => break StopReason::CaptureFailed,
                Err(e) => {
                    self.stop();
                    return Err(e);
                }
            }
        };
        tracing::debug!(?reason, "session loop finished");
        self.stop();
        Ok(reason)
    }
}

impl<S: FrameSource> Drop for Session<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
