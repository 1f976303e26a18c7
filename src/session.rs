//! Capture lifecycle for one meter-reading session.
//!
//! The session moves Scanning → Detected → Confirmed. Retry goes back to
//! Scanning and throws away the current result. Every capture gets a
//! generation number; a result whose generation is no longer current when it
//! arrives (because of a retry or dismissal) is discarded.

use anyhow::{Result, anyhow};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::candidates::digits_only;
use crate::model::{
    CapturedImage, DigitCandidate, LastKnownReading, MeterProfile, RankedResult, register_value,
};
use crate::pipeline::MeterReader;
use crate::recognizer::TextRecognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Scanning,
    Detected,
    Confirmed,
    Dismissed,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Scanning => write!(f, "Scanning"),
            ScanState::Detected => write!(f, "Detected"),
            ScanState::Confirmed => write!(f, "Confirmed"),
            ScanState::Dismissed => write!(f, "Dismissed"),
        }
    }
}

/// Proof that a capture was started; hand it back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The run was superseded by a retry or dismissal.
    Stale,
}

/// What the user picked on the detection screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Best,
    /// Zero-based index into `RankedResult::alternates`.
    Alternate(usize),
    Manual(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Best,
    Alternate,
    Manual,
}

/// Submission payload for an accepted reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedReading {
    pub reading_id: String,
    pub meter_id: String,
    pub value: String,
    pub numeric_value: Option<f64>,
    pub confidence: Option<f32>,
    pub source: ReadingSource,
    pub implausible_fallback: bool,
    pub captured_at: String,
    pub image_hash: String,
    pub processing_ms: u64,
    pub candidates: Vec<DigitCandidate>,
    #[serde(skip)]
    generation: u64,
}

#[derive(Debug, Clone)]
struct Detection {
    generation: u64,
    profile: MeterProfile,
    result: RankedResult,
}

#[derive(Debug, Clone)]
enum Phase {
    Scanning {
        in_flight: Option<(u64, MeterProfile)>,
    },
    Detected(Detection),
    Confirmed(AcceptedReading),
    Dismissed,
}

#[derive(Debug, Clone)]
pub struct ScanSession {
    phase: Phase,
    generation: u64,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Scanning { in_flight: None },
            generation: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        match self.phase {
            Phase::Scanning { .. } => ScanState::Scanning,
            Phase::Detected(_) => ScanState::Detected,
            Phase::Confirmed(_) => ScanState::Confirmed,
            Phase::Dismissed => ScanState::Dismissed,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Scanning { in_flight: Some(_) })
    }

    pub fn result(&self) -> Option<&RankedResult> {
        match &self.phase {
            Phase::Detected(detection) => Some(&detection.result),
            _ => None,
        }
    }

    pub fn confirmed(&self) -> Option<&AcceptedReading> {
        match &self.phase {
            Phase::Confirmed(reading) => Some(reading),
            _ => None,
        }
    }

    /// Starts a pipeline run for `profile`. Only one run may be in flight.
    pub fn begin_capture(&mut self, profile: MeterProfile) -> Result<RunTicket> {
        match &self.phase {
            Phase::Scanning { in_flight: None } => {
                self.generation += 1;
                self.phase = Phase::Scanning {
                    in_flight: Some((self.generation, profile)),
                };
                debug!(generation = self.generation, "capture started");
                Ok(RunTicket {
                    generation: self.generation,
                })
            }
            Phase::Scanning { in_flight: Some(_) } => {
                Err(anyhow!("a capture is already being processed"))
            }
            Phase::Detected(_) => Err(anyhow!(
                "a reading is already detected; retry to capture again"
            )),
            Phase::Confirmed(_) | Phase::Dismissed => Err(anyhow!("scan session is closed")),
        }
    }

    /// Applies a finished run. Any result, including an empty one, moves the
    /// session to Detected so the user can always fall back to manual entry.
    pub fn apply(&mut self, ticket: RunTicket, result: RankedResult) -> ApplyOutcome {
        let profile = match &mut self.phase {
            Phase::Scanning { in_flight }
                if in_flight.as_ref().map(|(generation, _)| *generation)
                    == Some(ticket.generation) =>
            {
                in_flight.take().map(|(_, profile)| profile)
            }
            _ => None,
        };
        let Some(profile) = profile else {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "discarding stale recognition result"
            );
            return ApplyOutcome::Stale;
        };
        let generation = ticket.generation;
        info!(
            generation,
            outcome = ?result.outcome(),
            "{} -> {}",
            ScanState::Scanning,
            ScanState::Detected
        );
        self.phase = Phase::Detected(Detection {
            generation,
            profile,
            result,
        });
        ApplyOutcome::Applied
    }

    /// Starts a run, awaits the pipeline and applies the result.
    pub async fn capture<R: TextRecognizer>(
        &mut self,
        reader: &MeterReader<R>,
        image: CapturedImage,
        profile: MeterProfile,
        last: Option<&LastKnownReading>,
    ) -> Result<ApplyOutcome> {
        let ticket = self.begin_capture(profile.clone())?;
        let result = reader.recognize(image, &profile, last).await;
        Ok(self.apply(ticket, result))
    }

    /// Goes back to Scanning, discarding the detection or the run in flight.
    pub fn retry(&mut self) -> Result<()> {
        match &self.phase {
            Phase::Detected(_) | Phase::Scanning { in_flight: Some(_) } => {
                let from = self.state();
                self.generation += 1;
                self.phase = Phase::Scanning { in_flight: None };
                info!(generation = self.generation, "{} -> {} (retry)", from, ScanState::Scanning);
                Ok(())
            }
            Phase::Scanning { in_flight: None } => Ok(()),
            Phase::Confirmed(_) | Phase::Dismissed => Err(anyhow!("scan session is closed")),
        }
    }

    /// Ends the session; a run still in flight will be discarded.
    pub fn dismiss(&mut self) {
        self.generation += 1;
        self.phase = Phase::Dismissed;
        info!(generation = self.generation, "scan session dismissed");
    }

    /// Builds the submission payload for a selection. The session stays in
    /// Detected until `confirm` reports a successful submission.
    pub fn accept(&self, selection: Selection) -> Result<AcceptedReading> {
        let Phase::Detected(detection) = &self.phase else {
            return Err(anyhow!("nothing to accept in state {}", self.state()));
        };
        let result = &detection.result;

        let (value, confidence, source) = match selection {
            Selection::Best => {
                let best = result
                    .best
                    .as_ref()
                    .ok_or_else(|| anyhow!("no candidate detected; enter the reading manually"))?;
                (best.digits_only.clone(), Some(best.confidence), ReadingSource::Best)
            }
            Selection::Alternate(index) => {
                let alternate = result.alternates.get(index).ok_or_else(|| {
                    anyhow!(
                        "alternate {} out of range ({} available)",
                        index,
                        result.alternates.len()
                    )
                })?;
                (
                    alternate.digits_only.clone(),
                    Some(alternate.confidence),
                    ReadingSource::Alternate,
                )
            }
            Selection::Manual(input) => (parse_manual(&input)?, None, ReadingSource::Manual),
        };

        let captured_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| anyhow!("failed to format timestamp: {err}"))?;
        let reading_id = format!(
            "{:x}",
            md5::compute(format!("{}:{}:{}", detection.profile.meter_id, value, captured_at))
        )[..16]
            .to_string();

        Ok(AcceptedReading {
            reading_id,
            meter_id: detection.profile.meter_id.clone(),
            numeric_value: register_value(&value, detection.profile.has_decimal_point),
            value,
            confidence,
            source,
            implausible_fallback: result.implausible_fallback,
            captured_at,
            image_hash: result.capture_hash.clone(),
            processing_ms: result.processing_ms,
            candidates: result.alternates.clone(),
            generation: detection.generation,
        })
    }

    /// Records a successful submission of `reading`; the session is then done.
    pub fn confirm(&mut self, reading: AcceptedReading) -> Result<()> {
        let Phase::Detected(detection) = &self.phase else {
            return Err(anyhow!("cannot confirm in state {}", self.state()));
        };
        if detection.generation != reading.generation {
            return Err(anyhow!("reading belongs to a discarded capture"));
        }
        info!(
            reading_id = %reading.reading_id,
            value = %reading.value,
            "{} -> {}",
            ScanState::Detected,
            ScanState::Confirmed
        );
        self.phase = Phase::Confirmed(reading);
        Ok(())
    }
}

fn parse_manual(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("manual reading is empty"));
    }
    if !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(anyhow!("manual reading must contain digits only: '{}'", trimmed));
    }
    Ok(digits_only(trimmed))
}
