//! Per-frame pipeline: preprocess → candidate search → scoring → ellipse
//! fit → blink classification.
//!
//! Everything here is a pure function of the frame and the configuration;
//! the frame counter lives in [`crate::Session`].

use image::GrayImage;

use crate::blink::{classify, BlinkDecision};
use crate::candidates::find_candidates;
use crate::config::TrackerConfig;
use crate::conic::{fit_contour_ellipse, Ellipse};
use crate::preprocess::preprocess_frame;
use crate::score::select_best;

/// Shape information of the winning candidate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PupilFit {
    /// Threshold level that produced the winning contour.
    pub threshold: u8,
    /// Contour area in pixels².
    pub contour_area: f64,
    /// Contour perimeter in pixels.
    pub perimeter: f64,
    pub circularity: f64,
    pub score: f64,
    /// Number of (compressed) contour points used for the fit.
    pub n_points: usize,
    /// Fitted ellipse, `None` when the contour is numerically degenerate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipse: Option<Ellipse>,
    /// Area enclosed by the fitted ellipse, for comparison with `contour_area`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipse_area: Option<f64>,
}

/// Full per-frame result: the reported decision plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameAnalysis {
    pub decision: BlinkDecision,
    /// Size-plausible candidates across all threshold levels.
    pub n_candidates: usize,
    /// Winning candidate, if any survived scoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<PupilFit>,
}

/// Run the pipeline on one frame and keep the intermediate evidence.
pub fn analyze_frame(frame: &GrayImage, config: &TrackerConfig) -> FrameAnalysis {
    let normalized = preprocess_frame(frame, config);
    let candidates = find_candidates(&normalized, config);
    let n_candidates = candidates.len();

    let Some(best) = select_best(candidates, config) else {
        tracing::debug!(n_candidates, "no pupil candidate");
        return FrameAnalysis {
            decision: BlinkDecision::SENTINEL,
            n_candidates,
            fit: None,
        };
    };

    let ellipse = fit_contour_ellipse(&best.candidate.points);
    let decision = match &ellipse {
        Some(e) => classify(e, best.candidate.area, config),
        None => {
            tracing::debug!(
                n_points = best.candidate.points.len(),
                "ellipse fit degenerate; reporting no detection"
            );
            BlinkDecision::SENTINEL
        }
    };
    tracing::debug!(
        n_candidates,
        threshold = best.candidate.threshold,
        circularity = best.circularity,
        blink = decision.blink,
        "frame analyzed"
    );

    FrameAnalysis {
        decision,
        n_candidates,
        fit: Some(PupilFit {
            threshold: best.candidate.threshold,
            contour_area: best.candidate.area,
            perimeter: best.candidate.perimeter,
            circularity: best.circularity,
            score: best.score,
            n_points: best.candidate.points.len(),
            ellipse_area: ellipse.map(|e| e.area()),
            ellipse,
        }),
    }
}

/// Run the pipeline on one frame and return only the reported decision.
pub fn process_frame(frame: &GrayImage, config: &TrackerConfig) -> BlinkDecision {
    analyze_frame(frame, config).decision
}
