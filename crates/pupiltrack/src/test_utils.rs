//! Shared fixtures for unit tests: synthetic eye frames and a scripted
//! frame source that counts lifecycle calls.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use image::{GrayImage, Luma};

use crate::source::{FrameSource, SourceError};

/// Uniform background with a filled axis-aligned ellipse.
pub(crate) fn draw_filled_ellipse(
    w: u32,
    h: u32,
    center: [f64; 2],
    semi_axes: [f64; 2],
    fg: u8,
    bg: u8,
) -> GrayImage {
    draw_rotated_ellipse(w, h, center, semi_axes, 0.0, fg, bg)
}

/// Uniform background with a filled ellipse rotated by `angle` radians.
pub(crate) fn draw_rotated_ellipse(
    w: u32,
    h: u32,
    center: [f64; 2],
    semi_axes: [f64; 2],
    angle: f64,
    fg: u8,
    bg: u8,
) -> GrayImage {
    let (sin_a, cos_a) = angle.sin_cos();
    let [a, b] = semi_axes;
    GrayImage::from_fn(w, h, |x, y| {
        let dx = f64::from(x) - center[0];
        let dy = f64::from(y) - center[1];
        let u = cos_a * dx + sin_a * dy;
        let v = -sin_a * dx + cos_a * dy;
        if (u / a).powi(2) + (v / b).powi(2) <= 1.0 {
            Luma([fg])
        } else {
            Luma([bg])
        }
    })
}

/// Uniform background with a filled rectangle at `origin` of `size` pixels.
pub(crate) fn draw_filled_rect(
    w: u32,
    h: u32,
    origin: [u32; 2],
    size: [u32; 2],
    fg: u8,
    bg: u8,
) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let inside = (origin[0]..origin[0] + size[0]).contains(&x)
            && (origin[1]..origin[1] + size[1]).contains(&y);
        Luma([if inside { fg } else { bg }])
    })
}

/// Counters shared between a [`ScriptedSource`] and the test body.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceProbe {
    opens: Rc<Cell<usize>>,
    closes: Rc<Cell<usize>>,
    captures: Rc<Cell<usize>>,
}

impl SourceProbe {
    pub(crate) fn opens(&self) -> usize {
        self.opens.get()
    }
    pub(crate) fn closes(&self) -> usize {
        self.closes.get()
    }
    pub(crate) fn captures(&self) -> usize {
        self.captures.get()
    }
}

/// Delivers a fixed script of capture results, then `None` forever.
///
/// Unlike a real device it counts every `close`, including redundant ones,
/// so tests can assert the session releases it exactly once.
pub(crate) struct ScriptedSource {
    frames: VecDeque<Option<GrayImage>>,
    probe: SourceProbe,
    pub(crate) fail_open: bool,
}

impl ScriptedSource {
    pub(crate) fn new(frames: Vec<Option<GrayImage>>) -> (Self, SourceProbe) {
        let probe = SourceProbe::default();
        let source = Self {
            frames: frames.into(),
            probe: probe.clone(),
            fail_open: false,
        };
        (source, probe)
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.fail_open {
            return Err(SourceError::Unavailable("scripted failure".into()));
        }
        self.probe.opens.set(self.probe.opens.get() + 1);
        Ok(())
    }

    fn capture(&mut self) -> Option<GrayImage> {
        self.probe.captures.set(self.probe.captures.get() + 1);
        self.frames.pop_front().flatten()
    }

    fn close(&mut self) {
        self.probe.closes.set(self.probe.closes.get() + 1);
    }
}
