#![cfg(test)]

use image::{DynamicImage, Rgba, RgbaImage};

use crate::geom::BBoxPx;
use crate::model::TextCandidate;
use crate::preprocess::encode_png;

/// Encoded PNG with a light background and a dark band, roughly a dial face.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |_, y| {
        if y > height / 3 && y < height * 2 / 3 {
            Rgba([30, 30, 30, 255])
        } else {
            Rgba([235, 235, 225, 255])
        }
    });
    encode_png(&DynamicImage::ImageRgba8(img)).expect("encode png")
}

pub(crate) fn text(raw: &str, confidence: f32) -> TextCandidate {
    TextCandidate::new(raw, confidence, BBoxPx::default())
}

/// A reading, a short label and a second plausible-looking number.
pub(crate) fn scenario_candidates() -> Vec<TextCandidate> {
    vec![text("123456", 0.95), text("99", 0.99), text("654321", 0.40)]
}
