//! Frame normalization: contrast stretch followed by median denoising.
//!
//! Small-aperture lenses produce muddy, low-contrast frames with heavy
//! single-pixel grain. Stretching pulls the darkest samples down to 0 so the
//! fixed threshold levels of the candidate search stay meaningful; the median
//! filter removes grain while keeping the pupil edge sharp.

use image::GrayImage;

use crate::config::TrackerConfig;

/// Normalize one frame. The output has the dimensions of the input.
pub fn preprocess_frame(frame: &GrayImage, config: &TrackerConfig) -> GrayImage {
    let stretched = contrast_stretch(frame);
    median_denoise(&stretched, config.blur_radius())
}

/// Rescale samples so that the frame minimum maps to 0 and the maximum
/// to (nearly) 255.
///
/// The scale is `255 / (max − min + 1)`; the `+ 1` keeps a uniform frame
/// well-defined (it maps to all zeros).
pub fn contrast_stretch(frame: &GrayImage) -> GrayImage {
    let raw = frame.as_raw();
    let Some((min, max)) = min_max(raw) else {
        return frame.clone();
    };
    let scale = 255.0 / (f32::from(max) - f32::from(min) + 1.0);

    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate().skip(usize::from(min)) {
        let stretched = (v as f32 - f32::from(min)) * scale;
        *out = stretched.round().clamp(0.0, 255.0) as u8;
    }

    let data = raw.iter().map(|&v| lut[usize::from(v)]).collect();
    GrayImage::from_raw(frame.width(), frame.height(), data)
        .unwrap_or_else(|| frame.clone())
}

/// Median filter with a `(2r + 1)²` square kernel; `r = 0` is the identity.
pub fn median_denoise(frame: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return frame.clone();
    }
    imageproc::filter::median_filter(frame, radius, radius)
}

fn min_max(data: &[u8]) -> Option<(u8, u8)> {
    let first = *data.first()?;
    Some(
        data.iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn stretch_maps_extremes() {
        let mut img = GrayImage::from_pixel(8, 8, Luma([120]));
        img.put_pixel(1, 1, Luma([40]));
        img.put_pixel(6, 6, Luma([200]));

        let out = contrast_stretch(&img);
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        // 160 * 255 / 161 rounds to 253.
        assert_eq!(out.get_pixel(6, 6)[0], 253);
        // 80 * 255 / 161 = 126.7
        assert_eq!(out.get_pixel(0, 0)[0], 127);
    }

    #[test]
    fn stretch_of_full_range_is_nearly_identity() {
        let data: Vec<u8> = (0..=255u8).collect();
        let img = GrayImage::from_raw(16, 16, data).expect("16x16");
        let out = contrast_stretch(&img);
        for (src, dst) in img.as_raw().iter().zip(out.as_raw()) {
            assert!((i16::from(*src) - i16::from(*dst)).abs() <= 1);
        }
    }

    #[test]
    fn uniform_frame_does_not_fail() {
        let img = GrayImage::from_pixel(32, 24, Luma([200]));
        let out = preprocess_frame(&img, &TrackerConfig::default());
        assert_eq!(out.dimensions(), (32, 24));
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn median_removes_isolated_grain() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([180]));
        img.put_pixel(10, 10, Luma([0]));
        img.put_pixel(3, 15, Luma([255]));
        let out = median_denoise(&img, 1);
        assert!(out.pixels().all(|p| p[0] == 180));
    }

    #[test]
    fn median_preserves_step_edge() {
        let img = GrayImage::from_fn(30, 10, |x, _| if x < 15 { Luma([10]) } else { Luma([240]) });
        let out = median_denoise(&img, 4);
        assert_eq!(out.get_pixel(14, 5)[0], 10);
        assert_eq!(out.get_pixel(15, 5)[0], 240);
    }

    #[test]
    fn kernel_of_one_disables_denoising() {
        let cfg = TrackerConfig {
            blur_kernel_size: 1,
            ..TrackerConfig::default()
        };
        let mut img = GrayImage::from_pixel(10, 10, Luma([200]));
        img.put_pixel(5, 5, Luma([0]));
        let out = preprocess_frame(&img, &cfg);
        assert_eq!(out.get_pixel(5, 5)[0], 0);
        assert_eq!(out.get_pixel(0, 0)[0], 254);
    }
}
