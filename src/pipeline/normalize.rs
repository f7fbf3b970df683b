//! Image normalisation: make a page photo or scan as legible as possible.
//!
//! Two entry points, chosen by [`NormalizationMode`]:
//!
//! * **Aggressive** ([`normalize_aggressive`]) — for photos of ruled notebook
//!   paper. Fixed order:
//!   1. crop the top margin (header, shadow band)
//!   2. grayscale
//!   3. deskew from the minimum-area rectangle around the ink
//!   4. global histogram equalisation
//!   5. adaptive mean binarisation (31 × 31 window by default)
//!   6. ruled-line removal: horizontal ink runs ≥ 50 px are erased
//!   7. light dilation of the ink (3 × 3)
//!
//! * **Gentle** ([`normalize_gentle`]) — for clean scans: grayscale, median
//!   denoise and a mild deskew from Hough lines over Canny edges. No
//!   binarisation, no crop.
//!
//! Both preserve the pixel extents of their input (the aggressive variant
//! loses only the cropped top band). Rotation samples with clamped
//! coordinates so the borders replicate edge pixels instead of filling with
//! black.
//!
//! Failure is an expected branch, not an exception: bytes that do not decode
//! come back as [`Normalization::Unchanged`] carrying the exact input.

use crate::config::{NormalizationMode, NormalizeParams};
use crate::document::MediaKind;
use crate::pipeline::encode::gray_to_png;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use imageproc::geometry::min_area_rect;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use imageproc::morphology::erode;
use imageproc::point::Point;
use tracing::{debug, warn};

const INK: u8 = 0;
const PAPER: u8 = 255;

/// Skew below this many degrees is left alone.
const MIN_SKEW_DEGREES: f32 = 0.1;

/// Hough lines tilted more than this are not treated as text baselines.
const MAX_GENTLE_SKEW_DEGREES: f32 = 15.0;

/// Upper bound on foreground samples fed to the convex hull.
const MAX_SKEW_SAMPLES: u64 = 250_000;

/// Outcome of [`normalize_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// PNG bytes of the normalised grayscale image.
    Processed(Vec<u8>),
    /// The input bytes, untouched, because they could not be processed.
    Unchanged(Vec<u8>),
}

impl Normalization {
    pub fn is_processed(&self) -> bool {
        matches!(self, Normalization::Processed(_))
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Normalization::Processed(b) | Normalization::Unchanged(b) => b,
        }
    }

    /// Attach the media kind the transcription engines must be told.
    ///
    /// Processed output is always PNG; unchanged output keeps the kind of
    /// the bytes that went in.
    pub fn into_image(self, original: MediaKind) -> NormalizedImage {
        match self {
            Normalization::Processed(bytes) => NormalizedImage {
                bytes,
                kind: MediaKind::Png,
                processed: true,
            },
            Normalization::Unchanged(bytes) => NormalizedImage {
                bytes,
                kind: original,
                processed: false,
            },
        }
    }
}

/// An encoded page image ready for transcription.
#[derive(Clone)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    kind: MediaKind,
    processed: bool,
}

impl NormalizedImage {
    pub fn new(bytes: Vec<u8>, kind: MediaKind) -> Self {
        Self {
            bytes,
            kind,
            processed: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Whether the normaliser rewrote the pixels.
    pub fn processed(&self) -> bool {
        self.processed
    }

    /// MIME type for the vision request; unknown kinds are sent as PNG.
    pub fn mime(&self) -> &'static str {
        self.kind.mime().unwrap_or("image/png")
    }
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .field("processed", &self.processed)
            .finish()
    }
}

/// Decode, normalise and re-encode an image.
///
/// Never fails: anything that cannot be decoded or encoded is returned
/// byte-for-byte as [`Normalization::Unchanged`].
pub fn normalize_bytes(bytes: &[u8], params: &NormalizeParams) -> Normalization {
    let image = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("Image decode failed, passing bytes through: {}", e);
            return Normalization::Unchanged(bytes.to_vec());
        }
    };

    if image.width() == 0 || image.height() == 0 {
        warn!("Empty image, passing bytes through");
        return Normalization::Unchanged(bytes.to_vec());
    }

    let gray = match params.mode {
        NormalizationMode::Aggressive => normalize_aggressive(image, params),
        NormalizationMode::Gentle => normalize_gentle(image),
    };

    match gray_to_png(&gray) {
        Ok(png) => {
            debug!(
                "Normalised ({:?}) → {}x{} px, {} bytes",
                params.mode,
                gray.width(),
                gray.height(),
                png.len()
            );
            Normalization::Processed(png)
        }
        Err(e) => {
            warn!("PNG encode failed, passing bytes through: {}", e);
            Normalization::Unchanged(bytes.to_vec())
        }
    }
}

/// Full illegibility rescue for photographed notebook pages.
pub fn normalize_aggressive(image: DynamicImage, params: &NormalizeParams) -> GrayImage {
    let cropped = crop_top(image, params.top_crop_fraction);
    let gray = cropped.to_luma8();

    let gray = match estimate_skew_min_area(&gray) {
        Some(skew) if skew.abs() >= MIN_SKEW_DEGREES => {
            debug!("Deskewing by {:.2}°", skew);
            rotate_replicate(&gray, skew)
        }
        _ => gray,
    };

    let gray = equalize_histogram(&gray);
    let bw = adaptive_binarize(&gray, params.threshold_block_size, params.threshold_offset);
    let bw = remove_ruled_lines(&bw, params.line_kernel_width);

    // Eroding the white paper grows the black ink.
    erode(&bw, Norm::LInf, 1)
}

/// Light touch for images that are already reasonably clean.
pub fn normalize_gentle(image: DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let denoised = median_filter(&gray, 1, 1);

    match estimate_skew_hough(&denoised) {
        Some(skew) if skew.abs() >= MIN_SKEW_DEGREES => {
            debug!("Gentle deskew by {:.2}°", skew);
            rotate_replicate(&denoised, skew)
        }
        _ => denoised,
    }
}

// ── Step 1: top-margin crop ──────────────────────────────────────────────────

fn crop_top(image: DynamicImage, fraction: f32) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let crop_y = (h as f32 * fraction.clamp(0.0, 1.0)) as u32;
    if crop_y == 0 || crop_y >= h {
        return image;
    }
    image.crop_imm(0, crop_y, w, h - crop_y)
}

// ── Step 3: deskew ───────────────────────────────────────────────────────────

/// Tilt of the ink mass in degrees, folded into (-45, 45].
///
/// Positive means the content descends to the right (image y grows
/// downwards).
pub fn estimate_skew_min_area(gray: &GrayImage) -> Option<f32> {
    let (w, h) = gray.dimensions();
    let level = otsu_level(gray);
    let step = sample_step(w, h);

    let mut points = Vec::new();
    for y in (0..h).step_by(step) {
        for x in (0..w).step_by(step) {
            if gray.get_pixel(x, y)[0] <= level {
                points.push(Point::new(x as i32, y as i32));
            }
        }
    }
    if points.len() < 3 {
        return None;
    }

    let corners = min_area_rect(&points);
    let dx = (corners[1].x - corners[0].x) as f32;
    let dy = (corners[1].y - corners[0].y) as f32;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    Some(fold_angle(dy.atan2(dx).to_degrees()))
}

/// Median tilt of near-horizontal Hough lines, in degrees.
pub fn estimate_skew_hough(gray: &GrayImage) -> Option<f32> {
    let edges = canny(gray, 50.0, 150.0);
    let options = LineDetectionOptions {
        vote_threshold: (gray.width() / 3).max(10),
        suppression_radius: 8,
    };

    let mut skews: Vec<f32> = detect_lines(&edges, options)
        .iter()
        .map(|line| line.angle_in_degrees as f32 - 90.0)
        .filter(|s| s.abs() <= MAX_GENTLE_SKEW_DEGREES)
        .collect();
    if skews.is_empty() {
        return None;
    }
    skews.sort_by(|a, b| a.total_cmp(b));
    Some(skews[skews.len() / 2])
}

fn sample_step(w: u32, h: u32) -> usize {
    let total = w as u64 * h as u64;
    if total <= MAX_SKEW_SAMPLES {
        return 1;
    }
    ((total as f64 / MAX_SKEW_SAMPLES as f64).sqrt().ceil() as usize).max(1)
}

/// Fold a rectangle edge angle into (-45, 45].
pub fn fold_angle(degrees: f32) -> f32 {
    let mut a = degrees % 180.0;
    while a > 45.0 {
        a -= 90.0;
    }
    while a <= -45.0 {
        a += 90.0;
    }
    a
}

/// Rotate so content tilted by `skew` degrees becomes level.
///
/// Same dimensions as the input; out-of-range samples clamp to the nearest
/// edge pixel.
pub fn rotate_replicate(gray: &GrayImage, skew: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let (sin, cos) = skew.to_radians().sin_cos();

    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cx + dx * cos - dy * sin;
        let sy = cy + dx * sin + dy * cos;
        Luma([sample_bilinear_clamped(gray, sx, sy)])
    })
}

fn sample_bilinear_clamped(gray: &GrayImage, x: f32, y: f32) -> u8 {
    let (w, h) = gray.dimensions();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p = |px: u32, py: u32| gray.get_pixel(px, py)[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

// ── Step 5: adaptive binarisation ────────────────────────────────────────────

/// Paper where a pixel is brighter than its local mean minus `offset`, ink elsewhere.
pub fn adaptive_binarize(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let radius = block_size / 2;
    let stride = w as usize + 1;

    // Summed-area table with a zero row and column in front.
    let mut table = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(radius) as usize;
        let y0 = y.saturating_sub(radius) as usize;
        let x1 = (x + radius).min(w - 1) as usize + 1;
        let y1 = (y + radius).min(h - 1) as usize + 1;

        let sum = table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as f32;
        let threshold = sum as f32 / count - offset as f32;

        if gray.get_pixel(x, y)[0] as f32 > threshold {
            Luma([PAPER])
        } else {
            Luma([INK])
        }
    })
}

// ── Step 6: ruled-line removal ───────────────────────────────────────────────

/// Erase horizontal ink runs of at least `min_run` pixels.
///
/// Equivalent to subtracting a morphological opening with a `1 × min_run`
/// kernel from the ink mask. Handwriting rarely stays on one pixel row for
/// that long, so it survives.
pub fn remove_ruled_lines(bw: &GrayImage, min_run: u32) -> GrayImage {
    let mut out = bw.clone();
    let (w, h) = bw.dimensions();

    for y in 0..h {
        let mut x = 0;
        while x < w {
            if bw.get_pixel(x, y)[0] != INK {
                x += 1;
                continue;
            }
            let start = x;
            while x < w && bw.get_pixel(x, y)[0] == INK {
                x += 1;
            }
            if x - start >= min_run {
                for rx in start..x {
                    out.put_pixel(rx, y, Luma([PAPER]));
                }
            }
        }
    }
    out
}
