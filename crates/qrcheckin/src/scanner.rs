//! Frame capture and QR decoding.
//!
//! [`scan_for_code`] is a blocking loop: it polls the [`ScanHandle`] before
//! every frame, pulls a frame from a [`FrameSource`] and hands it to a
//! [`CodeDecoder`]. It returns as soon as a code decodes, the stop flag is
//! set, or the source runs dry. Run it on a blocking thread.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::{imageops, Rgb, RgbImage};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use qrcheckin_camera::{CaptureSettings, Webcam};

use crate::error::{Error, Result};
use crate::session::ScanHandle;

/// Colour of the outline drawn around a detected code.
pub const HIGHLIGHT: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline width in pixels. Odd, so the line centres on the corner points.
pub const OUTLINE_WIDTH: i32 = 3;

/// Something that produces frames.
pub trait FrameSource {
    /// A short description of the source (for logging).
    fn describe(&self) -> String;

    /// Block until the next frame is ready. `None` means the source is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameRead`] when the device stops delivering frames.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Something that finds codes in a frame.
pub trait CodeDecoder: Send + Sync {
    /// Decode a frame. When a frame holds several codes, the last one that
    /// decodes to non-empty text is returned.
    fn decode(&self, frame: &RgbImage) -> Option<DecodedCode>;
}

/// A decoded code and where it sits in the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCode {
    /// Decoded text.
    pub payload: String,
    /// Corner points in frame coordinates, in drawing order.
    pub corners: [(i32, i32); 4],
}

/// A successful scan.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The decoded code.
    pub code: DecodedCode,
    /// The frame the code was found in, with the outline drawn on it.
    pub frame: RgbImage,
    /// Frames read before (and including) the hit.
    pub frames_read: u64,
}

/// Startup warning for builds without a camera backend, where every webcam
/// scan fails with [`Error::CameraUnavailable`].
#[must_use]
pub fn missing_camera_warning() -> Option<&'static str> {
    (qrcheckin_camera::backend_name() == "none").then_some(
        "Built without camera support, scans will report \"Could not open camera\". \
         Rebuild with --features native-camera",
    )
}

/// Frames from a webcam.
#[derive(Debug)]
pub struct WebcamSource {
    camera: Webcam,
}

impl WebcamSource {
    /// Open the camera.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraUnavailable`] if the camera cannot be opened.
    pub fn open(settings: CaptureSettings) -> Result<Self> {
        let camera = Webcam::open(settings)?;
        info!(camera = %camera.name(), "Camera opened");
        Ok(Self { camera })
    }
}

impl FrameSource for WebcamSource {
    fn describe(&self) -> String {
        self.camera.name()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(Some(self.camera.frame()?))
    }
}

/// Still images read from disk, one frame per file.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
}

impl ImageFileSource {
    /// Queue the given files.
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
        }
    }
}

impl FrameSource for ImageFileSource {
    fn describe(&self) -> String {
        format!("{} image file(s)", self.pending.len())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        load_image(&path).map(Some)
    }
}

/// Load an image file as RGB.
///
/// # Errors
///
/// Returns [`Error::Image`] if the file cannot be read or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl CodeDecoder for QrDecoder {
    fn decode(&self, frame: &RgbImage) -> Option<DecodedCode> {
        let grey = imageops::grayscale(frame);
        let width = grey.width() as usize;
        let height = grey.height() as usize;
        let pixels = grey.as_raw();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                pixels[y * width + x]
            });

        let mut found = None;
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, payload)) if payload.is_empty() => {
                    trace!("Grid decoded to empty text");
                }
                Ok((_meta, payload)) => {
                    let corners = grid.bounds.map(|p| (p.x, p.y));
                    found = Some(DecodedCode { payload, corners });
                }
                Err(e) => trace!(error = ?e, "Grid did not decode"),
            }
        }
        found
    }
}

/// Pull frames until a code decodes, the handle is stopped or the source ends.
///
/// # Errors
///
/// Returns the source's error if a frame cannot be read; the loop does not
/// retry.
pub fn scan_for_code(
    source: &mut dyn FrameSource,
    decoder: &dyn CodeDecoder,
    handle: &ScanHandle,
) -> Result<Option<Detection>> {
    let mut frames_read = 0u64;
    loop {
        if handle.should_stop() {
            debug!(frames_read, "Scan stopped");
            return Ok(None);
        }

        let Some(mut frame) = source.next_frame()? else {
            debug!(frames_read, "Frame source exhausted");
            return Ok(None);
        };
        frames_read += 1;
        trace!(frame = frames_read, "Frame read");

        if let Some(code) = decoder.decode(&frame) {
            if code.payload.is_empty() {
                trace!(frame = frames_read, "Ignoring empty code");
                continue;
            }
            annotate(&mut frame, &code);
            debug!(frames_read, payload = %code.payload, "Code detected");
            return Ok(Some(Detection {
                code,
                frame,
                frames_read,
            }));
        }
    }
}

/// Draw the code's outline onto the frame.
pub fn annotate(frame: &mut RgbImage, code: &DecodedCode) {
    let corners = &code.corners;
    for (from, to) in corners.iter().zip(corners.iter().cycle().skip(1)) {
        draw_line(frame, *from, *to, HIGHLIGHT);
    }
}

/// Bresenham line of [`OUTLINE_WIDTH`] pixels, clipped to the frame.
fn draw_line(frame: &mut RgbImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), colour: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);

    loop {
        stamp(frame, x, y, colour);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Fill the square pen around (`x`, `y`).
fn stamp(frame: &mut RgbImage, x: i32, y: i32, colour: Rgb<u8>) {
    let half = OUTLINE_WIDTH / 2;
    for py in (y - half)..=(y + half) {
        for px in (x - half)..=(x + half) {
            if let (Ok(px), Ok(py)) = (u32::try_from(px), u32::try_from(py)) {
                if px < frame.width() && py < frame.height() {
                    frame.put_pixel(px, py, colour);
                }
            }
        }
    }
}

/// Write an annotated frame into `dir` as a timestamped PNG.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the image cannot be
/// encoded.
pub fn save_snapshot(dir: &Path, detection: &Detection) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let safe: String = detection
        .code
        .payload
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(32)
        .collect();
    let name = format!("{}-{safe}.png", Local::now().format("%Y%m%d-%H%M%S%.3f"));
    let path = dir.join(name);

    detection
        .frame
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|source| Error::Image {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path.display(), "Snapshot saved");
    Ok(path)
}

/// A frame source plus decoder, ready to run one scan.
pub struct Scanner {
    source: Box<dyn FrameSource>,
    decoder: Box<dyn CodeDecoder>,
    snapshot_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("source", &self.source.describe())
            .field("snapshot_dir", &self.snapshot_dir)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Pair a source with the QR decoder.
    #[must_use]
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            decoder: Box::new(QrDecoder),
            snapshot_dir: None,
        }
    }

    /// Use a different decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Box<dyn CodeDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Save annotated frames of every hit into `dir`.
    #[must_use]
    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    /// Run one scan and return the decoded payload, if any.
    ///
    /// A failing snapshot write is logged and does not lose the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame cannot be read.
    pub fn run(&mut self, handle: &ScanHandle) -> Result<Option<DecodedCode>> {
        debug!(source = %self.source.describe(), "Scanning");
        let Some(detection) = scan_for_code(self.source.as_mut(), self.decoder.as_ref(), handle)?
        else {
            return Ok(None);
        };

        if let Some(dir) = &self.snapshot_dir {
            if let Err(e) = save_snapshot(dir, &detection) {
                warn!(error = %e, "Could not save snapshot");
            }
        }
        Ok(Some(detection.code))
    }
}
