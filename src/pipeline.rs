use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::candidates::{filter_digits, filter_plausible, rank};
use crate::model::{
    CapturedImage, LastKnownReading, MeterProfile, Preprocessing, RankedResult, TextCandidate,
};
use crate::preprocess::{decode_upright, deskew, encode_png, enhance, estimate_angle};
use crate::recognizer::TextRecognizer;
use crate::settings::Settings;

/// Turns a meter photo into ranked digit candidates.
#[derive(Debug, Clone)]
pub struct MeterReader<R: TextRecognizer> {
    recognizer: R,
    settings: Settings,
}

impl<R: TextRecognizer> MeterReader<R> {
    pub fn new(recognizer: R, settings: Settings) -> Self {
        Self {
            recognizer,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs one full recognition pass.
    ///
    /// Never fails: undecodable images, recognizer errors and empty results
    /// all end in a (possibly empty) `RankedResult`. The capture is consumed
    /// and dropped once extraction is done.
    pub async fn recognize(
        &self,
        image: CapturedImage,
        profile: &MeterProfile,
        last: Option<&LastKnownReading>,
    ) -> RankedResult {
        let started = Instant::now();
        let capture_hash = image.content_hash();
        let (prepared, preprocessing) = self.prepare(image).await;

        let extracted = self
            .bounded("extract_text", self.recognizer.extract_text(&prepared))
            .await;
        drop(prepared);
        debug!(count = extracted.len(), "text candidates extracted");

        let mut result = rank_candidates(&extracted, profile, last, &self.settings, preprocessing);
        result.capture_hash = capture_hash;
        result.processing_ms = started.elapsed().as_millis() as u64;
        info!(
            meter_id = %profile.meter_id,
            outcome = ?result.outcome(),
            best = result.best.as_ref().map(|b| b.digits_only.as_str()).unwrap_or("-"),
            alternates = result.alternates.len(),
            processing_ms = result.processing_ms,
            "recognition finished"
        );
        result
    }

    async fn prepare(&self, capture: CapturedImage) -> (Vec<u8>, Preprocessing) {
        let options = &self.settings.preprocess;
        if !options.enabled {
            return (capture.bytes, Preprocessing::Skipped);
        }

        let Some(upright) = decode_upright(&capture) else {
            return (capture.bytes, Preprocessing::Unavailable);
        };
        let upright_bytes = match encode_png(&upright) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("could not re-encode upright capture: {err:#}");
                return (capture.bytes, Preprocessing::Unavailable);
            }
        };
        drop(capture);

        let regions = self
            .bounded("detect_regions", self.recognizer.detect_regions(&upright_bytes))
            .await;
        let angle = estimate_angle(&regions);
        debug!(regions = regions.len(), ?angle, "estimated tilt");

        let (rotated, rotated_by) = deskew(upright, angle, options.deadband_degrees);
        let enhanced = enhance(&rotated, options);
        match encode_png(&enhanced) {
            Ok(bytes) => (bytes, Preprocessing::Applied { rotated_by }),
            Err(err) => {
                warn!("could not encode enhanced capture; using upright image: {err:#}");
                (upright_bytes, Preprocessing::Applied { rotated_by: None })
            }
        }
    }

    // Recognizer failures and timeouts read as "nothing found".
    async fn bounded<T, F>(&self, stage: &str, call: F) -> Vec<T>
    where
        F: Future<Output = anyhow::Result<Vec<T>>>,
    {
        let limit: Duration = self.settings.extract_timeout;
        match timeout(limit, call).await {
            Ok(Ok(items)) => items,
            Ok(Err(err)) => {
                warn!(stage, "recognizer unavailable: {err:#}");
                Vec::new()
            }
            Err(_) => {
                warn!(stage, timeout_secs = limit.as_secs_f32(), "recognizer timed out");
                Vec::new()
            }
        }
    }
}

/// Digit filter, plausibility filter and ranking over extracted text.
pub fn rank_candidates(
    extracted: &[TextCandidate],
    profile: &MeterProfile,
    last: Option<&LastKnownReading>,
    settings: &Settings,
    preprocessing: Preprocessing,
) -> RankedResult {
    let digit_candidates = filter_digits(extracted, profile.expected_digit_count);
    debug!(
        expected = profile.expected_digit_count,
        kept = digit_candidates.len(),
        dropped = extracted.len() - digit_candidates.len(),
        "digit filter"
    );

    let plausible = filter_plausible(
        digit_candidates,
        last,
        &settings.plausibility,
        profile.has_decimal_point,
    );
    let alternates = rank(plausible.candidates, settings.ranking.max_alternates);

    RankedResult {
        best: alternates.first().cloned(),
        alternates,
        implausible_fallback: plausible.implausible_fallback,
        preprocessing,
        capture_hash: String::new(),
        processing_ms: 0,
    }
}
