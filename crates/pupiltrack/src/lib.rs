//! Pupil position, pupil area and blink detection from raw
//! infrared eye frames.
//!
//! Tuned for tiny-aperture NoIR lenses: muddy, low-contrast, noisy frames.
//! The per-frame pipeline stages are:
//!
//! 1. **Preprocess** – contrast stretch to the full 8-bit range, median denoise.
//! 2. **Candidates** – binarize at several dark levels, trace outer contours,
//!    keep pupil-sized regions.
//! 3. **Score** – circularity × area, best candidate across all levels.
//! 4. **Conic** – direct least-squares ellipse fit of the winning contour.
//! 5. **Blink** – flattened or undersized ellipses are reported as blinks.
//!
//! A [`Session`] drives the pipeline over a [`FrameSource`] and stamps each
//! result with a frame index.
//!
//! # Example
//!
//! ```no_run
//! use std::ops::ControlFlow;
//! use std::sync::atomic::AtomicBool;
//! use pupiltrack::{RawFormat, RawYuvSource, Session, TrackerConfig};
//!
//! let config = TrackerConfig::default();
//! let source = RawYuvSource::new("eye.yuv", config.width(), config.height(), RawFormat::Yuv420);
//! let mut session = Session::open(source, config).unwrap();
//! let cancel = AtomicBool::new(false);
//! session
//!     .run(&cancel, |record| {
//!         println!("{:?}", record.as_tuple());
//!         ControlFlow::Continue(())
//!     })
//!     .unwrap();
//! ```

pub mod blink;
pub mod candidates;
pub mod conic;
mod config;
pub mod pipeline;
pub mod preprocess;
pub mod score;
mod session;
mod source;

#[cfg(test)]
mod test_utils;

pub use blink::BlinkDecision;
pub use config::{ConfigError, TrackerConfig};
pub use conic::Ellipse;
pub use pipeline::{analyze_frame, process_frame, FrameAnalysis, PupilFit};
pub use session::{FrameOutcome, Session, SessionError, SessionState, StopReason};
pub use source::{
    luma_from_yuv420, FrameSource, ImageSequenceSource, RawFormat, RawYuvSource, SourceError,
};

/// Per-frame output of a session.
///
/// When `blink` is true, `cx`, `cy` and `area` are exactly zero. Otherwise
/// `area > 0` and the values are rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsRecord {
    /// 1-based index of the frame within its session.
    pub frame_index: u64,
    pub blink: bool,
    /// Pupil center x in pixels.
    pub cx: f64,
    /// Pupil center y in pixels.
    pub cy: f64,
    /// Pupil contour area in pixels².
    pub area: f64,
}

impl MetricsRecord {
    pub fn new(frame_index: u64, decision: BlinkDecision) -> Self {
        Self {
            frame_index,
            blink: decision.blink,
            cx: decision.cx,
            cy: decision.cy,
            area: decision.area,
        }
    }

    /// The record as the ordered tuple `(frame_index, blink, cx, cy, area)`.
    pub fn as_tuple(&self) -> (u64, bool, f64, f64, f64) {
        (self.frame_index, self.blink, self.cx, self.cy, self.area)
    }
}
