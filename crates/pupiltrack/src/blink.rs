//! Open/closed eye decision from the fitted pupil ellipse.

use crate::config::TrackerConfig;
use crate::conic::Ellipse;

/// Per-frame measurement before it is stamped with a frame index.
///
/// When `blink` is true every other field is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlinkDecision {
    pub blink: bool,
    pub cx: f64,
    pub cy: f64,
    pub area: f64,
}

impl BlinkDecision {
    /// The canonical "eye closed / nothing detected" value.
    pub const SENTINEL: Self = Self {
        blink: true,
        cx: 0.0,
        cy: 0.0,
        area: 0.0,
    };
}

/// Classify a fitted ellipse and its contour area.
///
/// A blink is reported when the ellipse is flattened into an eyelid line
/// (`height < blink_aspect_ratio · width`) or the region is too small
/// (`area < blink_area_floor`). Otherwise the center and area are reported
/// rounded to two decimals.
pub fn classify(ellipse: &Ellipse, area: f64, config: &TrackerConfig) -> BlinkDecision {
    let flattened = ellipse.height() < config.blink_aspect_ratio * ellipse.width();
    let too_small = area < config.blink_area_floor;
    if flattened || too_small {
        tracing::trace!(flattened, too_small, area, "classified as blink");
        return BlinkDecision::SENTINEL;
    }
    BlinkDecision {
        blink: false,
        cx: round2(ellipse.cx),
        cy: round2(ellipse.cy),
        area: round2(area),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
