//! Image encoding: raster → PNG bytes, and PNG bytes → base64 `ImageData`.
//!
//! PNG is lossless, which matters more than size here: JPEG ringing around
//! thin pen strokes is exactly the kind of noise the normaliser just removed.

use crate::pipeline::normalize::NormalizedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, GrayImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a grayscale image as PNG.
pub fn gray_to_png(img: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Wrap a normalised image as a base64 attachment for the vision request.
///
/// `detail: "high"` asks GPT-4-class models for the full tile budget; at the
/// default single low-resolution tile handwriting is unreadable.
pub fn to_image_data(image: &NormalizedImage) -> ImageData {
    let b64 = STANDARD.encode(image.bytes());
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, image.mime()).with_detail("high")
}
