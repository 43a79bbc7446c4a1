//! Frame acquisition seam.
//!
//! The pipeline never talks to hardware directly. A [`FrameSource`] hands out
//! single-channel frames on demand and owns whatever device or file backs
//! them. Two file-backed sources are provided for replaying recorded
//! sessions: a list of image files and a raw planar YUV420 / Y8 dump.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use image::GrayImage;

/// Errors raised when a frame source cannot be opened.
#[derive(Debug)]
pub enum SourceError {
    /// The backing device or file could not be opened.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The source has nothing to deliver.
    Empty,
    /// The requested frame geometry is unusable.
    InvalidDimensions { width: u32, height: u32 },
    /// Source-specific failure (e.g. a device driver refusing to start).
    Unavailable(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot open {}: {}", path.display(), source),
            Self::Empty => write!(f, "frame source has no frames"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid frame dimensions {width}x{height}")
            }
            Self::Unavailable(msg) => write!(f, "frame source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Supplier of raw grayscale frames of a fixed size.
///
/// Implementations own the underlying device for as long as they are open.
/// `close` must be idempotent: calling it on a closed (or never opened)
/// source is a no-op.
///
/// # Example
///
/// ```
/// use image::GrayImage;
/// use pupiltrack::{FrameSource, SourceError};
///
/// struct Blank {
///     remaining: usize,
/// }
///
/// impl FrameSource for Blank {
///     fn open(&mut self) -> Result<(), SourceError> {
///         Ok(())
///     }
///     fn capture(&mut self) -> Option<GrayImage> {
///         self.remaining = self.remaining.checked_sub(1)?;
///         Some(GrayImage::new(64, 48))
///     }
///     fn close(&mut self) {}
/// }
/// ```
pub trait FrameSource {
    /// Acquire the device. Called once per session before any capture.
    fn open(&mut self) -> Result<(), SourceError>;
    /// Block until the next frame is available. `None` means this frame
    /// could not be acquired; it says nothing about later frames.
    fn capture(&mut self) -> Option<GrayImage>;
    /// Release the device.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<(), SourceError> {
        (**self).open()
    }
    fn capture(&mut self) -> Option<GrayImage> {
        (**self).capture()
    }
    fn close(&mut self) {
        (**self).close()
    }
}

// ---------------------------------------------------------------------------
// Image sequence
// ---------------------------------------------------------------------------

/// Replays a list of image files as frames, converting each to luma.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    open: bool,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            cursor: 0,
            open: false,
        }
    }

    /// Number of frames left to deliver.
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.cursor)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.paths.is_empty() {
            return Err(SourceError::Empty);
        }
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn capture(&mut self) -> Option<GrayImage> {
        if !self.open {
            return None;
        }
        let path = self.paths.get(self.cursor)?;
        self.cursor += 1;
        match image::open(path) {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                tracing::warn!("failed to decode frame {}: {}", path.display(), e);
                None
            }
        }
    }

    fn close(&mut self) {
        self.open = false;
    }
}

// ---------------------------------------------------------------------------
// Raw YUV420 / Y8 dump
// ---------------------------------------------------------------------------

/// Layout of one frame in a raw dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    /// Planar YUV 4:2:0 (I420): full-size Y plane followed by two
    /// quarter-size chroma planes.
    Yuv420,
    /// Bare 8-bit luma.
    Y8,
}

impl RawFormat {
    /// Bytes occupied by one frame of this format.
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        match self {
            Self::Y8 => luma,
            Self::Yuv420 => {
                let chroma = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
                luma + 2 * chroma
            }
        }
    }
}

/// Extract the Y-plane of a planar YUV420 buffer as a grayscale frame.
///
/// Returns `None` when the buffer is shorter than one luma plane.
pub fn luma_from_yuv420(buf: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let luma = width as usize * height as usize;
    let plane = buf.get(..luma)?;
    GrayImage::from_raw(width, height, plane.to_vec())
}

/// Reads consecutive fixed-size frames from a raw dump file.
pub struct RawYuvSource {
    path: PathBuf,
    width: u32,
    height: u32,
    format: RawFormat,
    reader: Option<BufReader<File>>,
    buf: Vec<u8>,
}

impl RawYuvSource {
    pub fn new(path: impl AsRef<Path>, width: u32, height: u32, format: RawFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            width,
            height,
            format,
            reader: None,
            buf: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl FrameSource for RawYuvSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SourceError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.buf = vec![0; self.format.frame_len(self.width, self.height)];
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    fn capture(&mut self) -> Option<GrayImage> {
        let reader = self.reader.as_mut()?;
        if let Err(e) = reader.read_exact(&mut self.buf) {
            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                tracing::warn!("raw frame read from {} failed: {}", self.path.display(), e);
            }
            return None;
        }
        luma_from_yuv420(&self.buf, self.width, self.height)
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
