//! Image preparation ahead of text recognition.
//!
//! Stages run in a fixed order: orientation, angle estimate, deskew, enhance.
//! None of them aborts a scan; each falls through with the best image it has.

mod angle;
mod enhance;
mod orientation;
mod rotate;

use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::model::CapturedImage;

pub use angle::estimate_angle;
pub use enhance::enhance;
pub use orientation::read_exif_orientation;
pub use rotate::deskew;

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    pub enabled: bool,
    pub deadband_degrees: f32,
    pub contrast: f32,
    pub sharpen_amount: f32,
    pub unsharp_sigma: f32,
    pub unsharp_threshold: i32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            deadband_degrees: 2.0,
            contrast: 30.0,
            sharpen_amount: 0.4,
            unsharp_sigma: 2.5,
            unsharp_threshold: 2,
        }
    }
}

/// Decodes the capture and applies its orientation.
///
/// `None` means the bytes could not be decoded; callers keep using the raw
/// capture in that case.
pub fn decode_upright(capture: &CapturedImage) -> Option<DynamicImage> {
    match image::load_from_memory(&capture.bytes) {
        Ok(image) => {
            debug!(orientation = ?capture.orientation, "decoded capture");
            Some(orientation::normalize_orientation(image, capture.orientation))
        }
        Err(err) => {
            warn!("capture could not be decoded; preprocessing unavailable: {err}");
            None
        }
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .with_context(|| "failed to encode image as png")?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Orientation;
    use crate::test_util::png_bytes;

    #[test]
    fn undecodable_capture_is_unavailable() {
        let capture = CapturedImage::new(b"\x00\x01garbage".to_vec(), Orientation::Up);
        assert!(decode_upright(&capture).is_none());
    }

    #[test]
    fn decoded_capture_is_rotated_upright() {
        let capture = CapturedImage::new(png_bytes(30, 10), Orientation::Left);
        let image = decode_upright(&capture).expect("decode");
        assert_eq!((image.width(), image.height()), (10, 30));
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let capture = CapturedImage::new(png_bytes(7, 5), Orientation::Up);
        let image = decode_upright(&capture).expect("decode");
        let encoded = encode_png(&image).expect("encode");
        let decoded = image::load_from_memory(&encoded).expect("decode again");
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
    }
}
