use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::candidates::{MAX_ALTERNATES, PlausibilityPolicy, RankingOptions};
use crate::preprocess::PreprocessOptions;
use crate::recognizer::TesseractOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub preprocess: PreprocessOptions,
    pub plausibility: PlausibilityPolicy,
    pub ranking: RankingOptions,
    pub tesseract: TesseractOptions,
    pub extract_timeout: Duration,
    pub consensus_frames: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preprocess: PreprocessOptions::default(),
            plausibility: PlausibilityPolicy::default(),
            ranking: RankingOptions::default(),
            tesseract: TesseractOptions::default(),
            extract_timeout: Duration::from_secs(20),
            consensus_frames: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    preprocess: Option<PreprocessSection>,
    plausibility: Option<PlausibilitySection>,
    ranking: Option<RankingSection>,
    recognizer: Option<RecognizerSection>,
    consensus: Option<ConsensusSection>,
}

#[derive(Debug, Default, Deserialize)]
struct PreprocessSection {
    enabled: Option<bool>,
    deadband_degrees: Option<f32>,
    contrast: Option<f32>,
    sharpen_amount: Option<f32>,
    unsharp_sigma: Option<f32>,
    unsharp_threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct PlausibilitySection {
    lower_ratio: Option<f64>,
    upper_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingSection {
    max_alternates: Option<usize>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizerSection {
    languages: Option<String>,
    psm: Option<u32>,
    char_whitelist: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConsensusSection {
    frames: Option<usize>,
}

/// Loads settings from the embedded defaults, then every settings file that
/// exists in lookup order. Later files override earlier ones key by key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse built-in settings")?;
    settings.merge(defaults);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(pre) = incoming.preprocess {
            if let Some(enabled) = pre.enabled {
                self.preprocess.enabled = enabled;
            }
            if let Some(deadband) = pre.deadband_degrees {
                if deadband >= 0.0 {
                    self.preprocess.deadband_degrees = deadband;
                }
            }
            if let Some(contrast) = pre.contrast {
                self.preprocess.contrast = contrast;
            }
            if let Some(amount) = pre.sharpen_amount {
                if amount >= 0.0 {
                    self.preprocess.sharpen_amount = amount;
                }
            }
            if let Some(sigma) = pre.unsharp_sigma {
                if sigma > 0.0 {
                    self.preprocess.unsharp_sigma = sigma;
                }
            }
            if let Some(threshold) = pre.unsharp_threshold {
                if threshold >= 0 {
                    self.preprocess.unsharp_threshold = threshold;
                }
            }
        }
        if let Some(band) = incoming.plausibility {
            let lower = band.lower_ratio.unwrap_or(self.plausibility.lower_ratio);
            let upper = band.upper_ratio.unwrap_or(self.plausibility.upper_ratio);
            if lower > 0.0 && lower <= upper {
                self.plausibility = PlausibilityPolicy {
                    lower_ratio: lower,
                    upper_ratio: upper,
                };
            }
        }
        if let Some(ranking) = incoming.ranking {
            if let Some(limit) = ranking.max_alternates {
                if (1..=MAX_ALTERNATES).contains(&limit) {
                    self.ranking.max_alternates = limit;
                }
            }
            if let Some(min) = ranking.min_confidence {
                if (0.0..=1.0).contains(&min) {
                    self.ranking.min_confidence = min;
                }
            }
        }
        if let Some(recognizer) = incoming.recognizer {
            if let Some(languages) = recognizer.languages {
                if !languages.trim().is_empty() {
                    self.tesseract.languages = languages.trim().to_string();
                }
            }
            if let Some(psm) = recognizer.psm {
                if psm <= 13 {
                    self.tesseract.psm = psm;
                }
            }
            if let Some(whitelist) = recognizer.char_whitelist {
                if !whitelist.trim().is_empty() {
                    self.tesseract.char_whitelist = whitelist.trim().to_string();
                }
            }
            if let Some(secs) = recognizer.timeout_secs {
                if secs > 0 {
                    self.extract_timeout = Duration::from_secs(secs);
                }
            }
        }
        if let Some(consensus) = incoming.consensus {
            if let Some(frames) = consensus.frames {
                if frames > 0 {
                    self.consensus_frames = frames;
                }
            }
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".meter-reader"))
        }
    })
}
