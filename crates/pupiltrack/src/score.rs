//! Circularity-weighted candidate selection.

use crate::candidates::Candidate;
use crate::config::TrackerConfig;
use crate::conic::MIN_FIT_POINTS;

/// The winning candidate with the measures that made it win.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// `4π·area / perimeter²`.
    pub circularity: f64,
    /// `circularity × area`.
    pub score: f64,
}

/// `4π·area / perimeter²`: 1.0 for a circle, π/4 for a square.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// Pick the candidate with the strictly highest score.
///
/// Candidates with a non-positive perimeter, too few points to fit an
/// ellipse, or circularity at or below `config.min_circularity` are skipped.
/// On equal scores the earliest candidate wins, so the scan order of
/// threshold levels decides ties.
pub fn select_best(candidates: Vec<Candidate>, config: &TrackerConfig) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for candidate in candidates {
        if candidate.perimeter <= 0.0 || candidate.points.len() < MIN_FIT_POINTS {
            continue;
        }
        let circ = circularity(candidate.area, candidate.perimeter);
        if circ <= config.min_circularity {
            continue;
        }
        let score = circ * candidate.area;
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(ScoredCandidate {
                candidate,
                circularity: circ,
                score,
            });
        }
    }
    best
}
