use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{RecognizerFuture, TextRecognizer};
use crate::geom::{BBoxPx, Quad};
use crate::model::TextCandidate;

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    candidates: Vec<FixtureCandidate>,
    #[serde(default)]
    regions: Vec<Quad>,
}

#[derive(Debug, Deserialize)]
struct FixtureCandidate {
    text: String,
    confidence: f32,
    #[serde(default)]
    bbox: BBoxPx,
}

/// Serves a fixed set of candidates and regions regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct FixtureRecognizer {
    candidates: Vec<TextCandidate>,
    regions: Vec<Quad>,
}

impl FixtureRecognizer {
    pub fn new(candidates: Vec<TextCandidate>, regions: Vec<Quad>) -> Self {
        Self {
            candidates,
            regions,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: FixtureFile =
            serde_json::from_str(json).with_context(|| "failed to parse recognizer fixture")?;
        let candidates = file
            .candidates
            .into_iter()
            .map(|c| TextCandidate::new(c.text, c.confidence, c.bbox))
            .collect();
        Ok(Self::new(candidates, file.regions))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture: {}", path.display()))?;
        Self::from_json(&json)
    }
}

impl TextRecognizer for FixtureRecognizer {
    fn detect_regions<'a>(&'a self, _image: &'a [u8]) -> RecognizerFuture<'a, Vec<Quad>> {
        let regions = self.regions.clone();
        Box::pin(async move { Ok(regions) })
    }

    fn extract_text<'a>(&'a self, _image: &'a [u8]) -> RecognizerFuture<'a, Vec<TextCandidate>> {
        let candidates = self.candidates.clone();
        Box::pin(async move { Ok(candidates) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_fixture_round_trips_through_trait() {
        let recognizer = FixtureRecognizer::from_json(
            r#"{
                "candidates": [
                    {"text": "0123.45", "confidence": 0.9, "bbox": {"x": 1, "y": 2, "w": 3, "h": 4}},
                    {"text": "kWh", "confidence": 1.4}
                ],
                "regions": [[[0, 0], [100, 5], [100, 25], [0, 20]]]
            }"#,
        )
        .expect("fixture");

        let candidates = recognizer.extract_text(b"").await.expect("candidates");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].bbox, BBoxPx { x: 1, y: 2, w: 3, h: 4 });
        assert_eq!(candidates[1].confidence, 1.0);

        let regions = recognizer.detect_regions(b"").await.expect("regions");
        assert_eq!(regions.len(), 1);
        assert!(regions[0].top_edge_angle().expect("angle") > 2.0);
    }

    #[test]
    fn empty_object_is_an_empty_fixture() {
        let recognizer = FixtureRecognizer::from_json("{}").expect("fixture");
        assert!(recognizer.candidates.is_empty());
        assert!(recognizer.regions.is_empty());
    }

    #[test]
    fn malformed_fixture_is_an_error() {
        assert!(FixtureRecognizer::from_json("[1, 2").is_err());
    }
}
