use anyhow::{Context, Result, anyhow};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod candidates;
pub mod consensus;
pub mod geom;
pub mod logging;
pub mod model;
mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod report;
pub mod session;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use consensus::ConsensusTracker;
pub use model::{
    CapturedImage, DigitCandidate, LastKnownReading, MeterProfile, Orientation, Outcome,
    Preprocessing, RankedResult, TextCandidate,
};
pub use pipeline::{MeterReader, rank_candidates};
pub use recognizer::{FixtureRecognizer, TesseractRecognizer, TextRecognizer};
pub use report::render_report;
pub use session::{AcceptedReading, ApplyOutcome, ScanSession, ScanState, Selection};
pub use settings::{Settings, load_settings};

pub type DynReader = MeterReader<Box<dyn TextRecognizer>>;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub images: Vec<PathBuf>,
    pub meter_id: String,
    pub digits: usize,
    pub decimal: bool,
    pub last: Option<f64>,
    pub fixture: Option<PathBuf>,
    pub consensus: bool,
    pub accept: Option<String>,
    pub json: bool,
    pub settings_path: Option<String>,
    pub show_languages: bool,
}

impl Config {
    pub fn profile(&self) -> Result<MeterProfile> {
        MeterProfile::new(self.meter_id.clone(), self.digits, self.decimal)
    }

    pub fn last_reading(&self) -> Option<LastKnownReading> {
        self.last.map(LastKnownReading::new)
    }
}

pub async fn run(config: Config) -> Result<String> {
    if config.show_languages {
        let languages = recognizer::list_tesseract_languages(Path::new("tesseract")).await?;
        return Ok(languages.join("\n"));
    }
    if config.images.is_empty() {
        return Err(anyhow!("no image given (use --image <path>)"));
    }
    if config.accept.is_some() && config.images.len() > 1 {
        return Err(anyhow!("--accept works with a single --image"));
    }

    let profile = config.profile()?;
    let last = config.last_reading();
    let reader = build_reader(&config).await?;

    if config.consensus {
        return run_consensus(&reader, &config, &profile, last.as_ref()).await;
    }

    let mut outputs = Vec::new();
    for path in &config.images {
        let capture = read_capture(path)?;
        let mut session = ScanSession::new();
        session
            .capture(&reader, capture, profile.clone(), last.as_ref())
            .await?;
        let result = session
            .result()
            .cloned()
            .ok_or_else(|| anyhow!("recognition did not produce a result"))?;

        if let Some(selection) = config.accept.as_deref() {
            let reading = session.accept(parse_selection(selection)?)?;
            session.confirm(reading.clone())?;
            return serde_json::to_string_pretty(&reading)
                .with_context(|| "failed to serialize accepted reading");
        }

        if config.json {
            outputs.push(
                serde_json::to_string_pretty(&result)
                    .with_context(|| "failed to serialize result")?,
            );
        } else {
            outputs.push(render_report(&result, &profile));
        }
    }
    Ok(outputs.join("\n\n"))
}

/// Loads settings and the recognizer backend named by `config`.
pub async fn build_reader(config: &Config) -> Result<DynReader> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let recognizer: Box<dyn TextRecognizer> = match config.fixture.as_deref() {
        Some(path) => Box::new(FixtureRecognizer::load(path)?),
        None => {
            let tesseract = TesseractRecognizer::new(settings.tesseract.clone())
                .resolve_languages()
                .await?;
            debug!(
                languages = %tesseract.options().languages,
                psm = tesseract.options().psm,
                "tesseract recognizer ready"
            );
            Box::new(tesseract)
        }
    };
    Ok(MeterReader::new(recognizer, settings))
}

pub fn read_capture(path: &Path) -> Result<CapturedImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image: {}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("image is empty: {}", path.display()));
    }
    Ok(CapturedImage::from_encoded(bytes))
}

/// Parses `best`, `alt:N` (1-based, as listed in the report) or a digit
/// string for manual entry.
pub fn parse_selection(input: &str) -> Result<Selection> {
    let value = input.trim();
    if value.eq_ignore_ascii_case("best") {
        return Ok(Selection::Best);
    }
    if let Some(index) = value
        .strip_prefix("alt:")
        .or_else(|| value.strip_prefix("alt "))
    {
        let index = index
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid alternate index '{}'", index.trim()))?;
        if index == 0 {
            return Err(anyhow!("alternates are numbered from 1"));
        }
        return Ok(Selection::Alternate(index - 1));
    }
    Ok(Selection::Manual(value.to_string()))
}

async fn run_consensus(
    reader: &DynReader,
    config: &Config,
    profile: &MeterProfile,
    last: Option<&LastKnownReading>,
) -> Result<String> {
    let min_confidence = reader.settings().ranking.min_confidence;
    let mut tracker = ConsensusTracker::new(reader.settings().consensus_frames);
    let mut agreed = None;
    let mut frames = 0;
    for path in &config.images {
        let capture = read_capture(path)?;
        let result = reader.recognize(capture, profile, last).await;
        frames += 1;
        if let Some(value) = tracker.observe(&result, min_confidence) {
            agreed = Some(value);
            break;
        }
    }

    if config.json {
        let payload = json!({
            "meter_id": profile.meter_id,
            "value": agreed,
            "frames": frames,
            "required": tracker.required(),
        });
        return serde_json::to_string_pretty(&payload)
            .with_context(|| "failed to serialize consensus");
    }
    Ok(match agreed {
        Some(value) => format!("consensus: {} after {} frame(s)", value, frames),
        None => format!(
            "consensus: not reached after {} frame(s) ({} required)",
            frames,
            tracker.required()
        ),
    })
}
