//! Tracker configuration.
//!
//! Every tunable of the frame-to-metrics pipeline lives in [`TrackerConfig`].
//! Each field only affects the stage named in its docs. A JSON file may
//! specify any subset of fields; missing fields keep their defaults.

use std::path::Path;

/// Errors reported for malformed configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A field holds a value outside its valid domain.
    Invalid {
        /// Field name as spelled in the JSON schema.
        field: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },
    /// The configuration file could not be read.
    Io(std::io::Error),
    /// The configuration file is not valid JSON for this schema.
    Parse(serde_json::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid { .. } => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

/// Configuration of one tracking session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Expected frame size `[width, height]` in pixels. Frames of any other
    /// size are reported as capture failures.
    pub resolution: [u32; 2],
    /// Nominal sensor frame rate. Informational for frame sources.
    pub fps: u32,
    /// Intensity cut points scanned by the candidate search, strictly ascending.
    pub threshold_levels: Vec<u8>,
    /// Open interval `(min, max)` of plausible pupil contour areas in pixels².
    pub pupil_area_range: [f64; 2],
    /// Candidates with circularity at or below this floor are discarded.
    pub min_circularity: f64,
    /// A fitted ellipse with `height < blink_aspect_ratio * width` is a blink.
    pub blink_aspect_ratio: f64,
    /// A winning candidate with area below this floor is a blink.
    pub blink_area_floor: f64,
    /// Side of the square median-filter kernel (odd). `1` disables denoising.
    pub blur_kernel_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            resolution: [640, 480],
            fps: 60,
            threshold_levels: vec![25, 45, 65, 85],
            pupil_area_range: [400.0, 25_000.0],
            min_circularity: 0.20,
            blink_aspect_ratio: 0.30,
            blink_area_floor: 500.0,
            blur_kernel_size: 9,
        }
    }
}

impl TrackerConfig {
    /// Default configuration at a different sensor resolution.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            resolution: [width, height],
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text and validate it.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.resolution[0]
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.resolution[1]
    }

    /// Median-filter radius derived from the kernel size.
    pub fn blur_radius(&self) -> u32 {
        self.blur_kernel_size / 2
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [w, h] = self.resolution;
        if w == 0 || h == 0 {
            return Err(ConfigError::invalid(
                "resolution",
                format!("must be non-zero, got {w}x{h}"),
            ));
        }
        if self.fps == 0 {
            return Err(ConfigError::invalid("fps", "must be positive"));
        }
        if self.threshold_levels.is_empty() {
            return Err(ConfigError::invalid(
                "threshold_levels",
                "at least one level is required",
            ));
        }
        if self.threshold_levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::invalid(
                "threshold_levels",
                format!("must be strictly ascending, got {:?}", self.threshold_levels),
            ));
        }
        let [min_area, max_area] = self.pupil_area_range;
        if !min_area.is_finite() || !max_area.is_finite() || min_area < 0.0 {
            return Err(ConfigError::invalid(
                "pupil_area_range",
                "bounds must be finite and non-negative",
            ));
        }
        if min_area >= max_area {
            return Err(ConfigError::invalid(
                "pupil_area_range",
                format!("min ({min_area}) must be below max ({max_area})"),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_circularity) {
            return Err(ConfigError::invalid(
                "min_circularity",
                format!("must lie in [0, 1], got {}", self.min_circularity),
            ));
        }
        if !self.blink_aspect_ratio.is_finite() || self.blink_aspect_ratio <= 0.0 {
            return Err(ConfigError::invalid(
                "blink_aspect_ratio",
                format!("must be positive, got {}", self.blink_aspect_ratio),
            ));
        }
        if !self.blink_area_floor.is_finite() || self.blink_area_floor < 0.0 {
            return Err(ConfigError::invalid(
                "blink_area_floor",
                format!("must be non-negative, got {}", self.blink_area_floor),
            ));
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(ConfigError::invalid(
                "blur_kernel_size",
                format!("must be an odd positive integer, got {}", self.blur_kernel_size),
            ));
        }
        if self.blur_kernel_size > w.min(h) {
            return Err(ConfigError::invalid(
                "blur_kernel_size",
                format!(
                    "{} exceeds the smaller frame side ({})",
                    self.blur_kernel_size,
                    w.min(h)
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_invalid(config: &TrackerConfig, expected_field: &str) {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected invalid `{expected_field}`, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = TrackerConfig::default();
        cfg.validate().expect("defaults must validate");
        assert_eq!(cfg.threshold_levels, vec![25, 45, 65, 85]);
        assert_eq!(cfg.blur_radius(), 4);
        assert_eq!((cfg.width(), cfg.height()), (640, 480));
    }

    #[test]
    fn rejects_bad_fields() {
        let base = TrackerConfig::default();

        expect_invalid(&TrackerConfig::with_resolution(0, 480), "resolution");
        expect_invalid(&TrackerConfig { fps: 0, ..base.clone() }, "fps");
        expect_invalid(
            &TrackerConfig {
                threshold_levels: vec![],
                ..base.clone()
            },
            "threshold_levels",
        );
        expect_invalid(
            &TrackerConfig {
                threshold_levels: vec![45, 25],
                ..base.clone()
            },
            "threshold_levels",
        );
        expect_invalid(
            &TrackerConfig {
                threshold_levels: vec![25, 25],
                ..base.clone()
            },
            "threshold_levels",
        );
        expect_invalid(
            &TrackerConfig {
                pupil_area_range: [500.0, 400.0],
                ..base.clone()
            },
            "pupil_area_range",
        );
        expect_invalid(
            &TrackerConfig {
                pupil_area_range: [f64::NAN, 400.0],
                ..base.clone()
            },
            "pupil_area_range",
        );
        expect_invalid(
            &TrackerConfig {
                min_circularity: 1.5,
                ..base.clone()
            },
            "min_circularity",
        );
        expect_invalid(
            &TrackerConfig {
                blink_aspect_ratio: 0.0,
                ..base.clone()
            },
            "blink_aspect_ratio",
        );
        expect_invalid(
            &TrackerConfig {
                blink_area_floor: -1.0,
                ..base.clone()
            },
            "blink_area_floor",
        );
        expect_invalid(
            &TrackerConfig {
                blur_kernel_size: 8,
                ..base.clone()
            },
            "blur_kernel_size",
        );
        expect_invalid(
            &TrackerConfig {
                blur_kernel_size: 481,
                ..base
            },
            "blur_kernel_size",
        );
    }

    #[test]
    fn blur_kernel_may_span_the_short_side() {
        let cfg = TrackerConfig {
            blur_kernel_size: 7,
            ..TrackerConfig::with_resolution(40, 7)
        };
        assert!(cfg.validate().is_ok());
        let too_wide = TrackerConfig {
            blur_kernel_size: 9,
            ..cfg
        };
        assert!(matches!(
            too_wide.validate(),
            Err(ConfigError::Invalid {
                field: "blur_kernel_size",
                ..
            })
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = TrackerConfig::from_json_str(
            r#"{ "resolution": [320, 240], "threshold_levels": [30, 60] }"#,
        )
        .expect("partial config parses");
        assert_eq!(cfg.resolution, [320, 240]);
        assert_eq!(cfg.threshold_levels, vec![30, 60]);
        assert_eq!(cfg.blur_kernel_size, 9);
        assert_eq!(cfg.pupil_area_range, [400.0, 25_000.0]);
    }

    #[test]
    fn json_is_validated_and_strict() {
        assert!(matches!(
            TrackerConfig::from_json_str(r#"{ "blur_kernel_size": 4 }"#),
            Err(ConfigError::Invalid {
                field: "blur_kernel_size",
                ..
            })
        ));
        assert!(matches!(
            TrackerConfig::from_json_str(r#"{ "blur_size": 5 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn json_roundtrip() {
        let cfg = TrackerConfig {
            min_circularity: 0.35,
            ..TrackerConfig::with_resolution(320, 240)
        };
        let text = serde_json::to_string(&cfg).expect("serialize");
        assert_eq!(TrackerConfig::from_json_str(&text).expect("parse"), cfg);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TrackerConfig::from_json_file(Path::new("/nonexistent/pupiltrack.json"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
