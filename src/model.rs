use anyhow::{Result, anyhow};
use serde::Serialize;
use time::OffsetDateTime;

use crate::geom::BBoxPx;

/// EXIF-style orientation of the captured pixels relative to the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    /// Maps an EXIF orientation tag (1-8). Unknown tags are treated as upright.
    pub fn from_exif_tag(tag: u32) -> Self {
        match tag {
            2 => Orientation::UpMirrored,
            3 => Orientation::Down,
            4 => Orientation::DownMirrored,
            5 => Orientation::LeftMirrored,
            6 => Orientation::Right,
            7 => Orientation::RightMirrored,
            8 => Orientation::Left,
            _ => Orientation::Up,
        }
    }
}

/// An encoded photo as delivered by the capture callback.
///
/// Owned by exactly one pipeline run; `recognize` consumes it.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub orientation: Orientation,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, orientation: Orientation) -> Self {
        Self { bytes, orientation }
    }

    /// Builds a capture whose orientation is read from embedded EXIF data.
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        let orientation = crate::preprocess::read_exif_orientation(&bytes);
        Self { bytes, orientation }
    }

    pub fn content_hash(&self) -> String {
        format!("{:x}", md5::compute(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterProfile {
    pub meter_id: String,
    pub expected_digit_count: usize,
    pub has_decimal_point: bool,
}

impl MeterProfile {
    pub fn new(
        meter_id: impl Into<String>,
        expected_digit_count: usize,
        has_decimal_point: bool,
    ) -> Result<Self> {
        if expected_digit_count == 0 {
            return Err(anyhow!("expected digit count must be at least 1"));
        }
        Ok(Self {
            meter_id: meter_id.into(),
            expected_digit_count,
            has_decimal_point,
        })
    }
}

/// Previously accepted value, in the same units as
/// `AcceptedReading::numeric_value` (decimal meters included).
#[derive(Debug, Clone, PartialEq)]
pub struct LastKnownReading {
    pub numeric_value: f64,
    pub captured_at: Option<OffsetDateTime>,
}

impl LastKnownReading {
    pub fn new(numeric_value: f64) -> Self {
        Self {
            numeric_value,
            captured_at: None,
        }
    }
}

/// Raw transcription returned by a recognizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextCandidate {
    pub raw_text: String,
    pub confidence: f32,
    pub bbox: BBoxPx,
}

impl TextCandidate {
    pub fn new(raw_text: impl Into<String>, confidence: f32, bbox: BBoxPx) -> Self {
        Self {
            raw_text: raw_text.into(),
            confidence: clamp_confidence(confidence),
            bbox,
        }
    }
}

/// A candidate reduced to its digits, already checked against the meter's
/// digit count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitCandidate {
    pub digits_only: String,
    pub confidence: f32,
    pub bbox: BBoxPx,
}

impl DigitCandidate {
    pub fn numeric_value(&self, has_decimal_point: bool) -> Option<f64> {
        register_value(&self.digits_only, has_decimal_point)
    }
}

/// Value shown by a register; with a decimal point the last digit is the
/// fractional one.
pub fn register_value(digits: &str, has_decimal_point: bool) -> Option<f64> {
    let value = digits.parse::<f64>().ok()?;
    Some(if has_decimal_point { value / 10.0 } else { value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Empty,
    ImplausibleFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Preprocessing {
    /// Stages ran; `rotated_by` is the applied correction in degrees, if any.
    Applied { rotated_by: Option<f32> },
    /// Disabled by settings.
    Skipped,
    /// The capture could not be decoded; recognition saw the raw bytes.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub best: Option<DigitCandidate>,
    pub alternates: Vec<DigitCandidate>,
    pub implausible_fallback: bool,
    pub preprocessing: Preprocessing,
    /// md5 of the encoded capture, for tying a submission to its photo.
    pub capture_hash: String,
    pub processing_ms: u64,
}

impl RankedResult {
    pub fn empty(preprocessing: Preprocessing) -> Self {
        Self {
            best: None,
            alternates: Vec::new(),
            implausible_fallback: false,
            preprocessing,
            capture_hash: String::new(),
            processing_ms: 0,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.best, self.implausible_fallback) {
            (None, _) => Outcome::Empty,
            (Some(_), true) => Outcome::ImplausibleFallback,
            (Some(_), false) => Outcome::Accepted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }
}

pub(crate) fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
