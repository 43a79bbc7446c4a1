//! Synthetic eye frames and a counting frame source for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{GrayImage, Luma};
use pupiltrack::{FrameSource, SourceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform background with a filled dark ellipse (semi-axes `a`, `b`).
pub fn eye_frame(w: u32, h: u32, center: [f64; 2], a: f64, b: f64, pupil: u8, bg: u8) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let dx = (f64::from(x) - center[0]) / a;
        let dy = (f64::from(y) - center[1]) / b;
        Luma([if dx * dx + dy * dy <= 1.0 { pupil } else { bg }])
    })
}

/// Seeded uniform noise of amplitude `±amp` added to every sample.
pub fn add_noise(img: &mut GrayImage, amp: i16, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in img.pixels_mut() {
        let n = rng.gen_range(-amp..=amp);
        p[0] = (i16::from(p[0]) + n).clamp(0, 255) as u8;
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub captures: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

/// Repeats one frame `frames` times, then reports capture failures.
pub struct LoopSource {
    frame: GrayImage,
    left: usize,
    pub counters: Arc<Counters>,
}

impl LoopSource {
    pub fn new(frame: GrayImage, frames: usize) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let src = Self {
            frame,
            left: frames,
            counters: Arc::clone(&counters),
        };
        (src, counters)
    }
}

impl FrameSource for LoopSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&mut self) -> Option<GrayImage> {
        self.counters.captures.fetch_add(1, Ordering::SeqCst);
        self.left = self.left.checked_sub(1)?;
        Some(self.frame.clone())
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}
