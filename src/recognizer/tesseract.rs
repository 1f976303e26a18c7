use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use super::parse::{parse_tsv_candidates, parse_tsv_regions};
use super::{RecognizerFuture, TextRecognizer};
use crate::geom::Quad;
use crate::model::TextCandidate;

#[derive(Debug, Clone, PartialEq)]
pub struct TesseractOptions {
    pub languages: String,
    /// Page segmentation mode; 7 treats the image as a single text line.
    pub psm: u32,
    pub char_whitelist: String,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            psm: 7,
            char_whitelist: "0123456789.,".to_string(),
        }
    }
}

/// Recognizer backed by the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    executable: PathBuf,
    options: TesseractOptions,
}

impl TesseractRecognizer {
    pub fn new(options: TesseractOptions) -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            options,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn options(&self) -> &TesseractOptions {
        &self.options
    }

    /// Narrows the configured languages to the ones tesseract has installed.
    pub async fn resolve_languages(mut self) -> Result<Self> {
        let available = match list_tesseract_languages(&self.executable).await {
            Ok(list) => list,
            Err(err) => {
                debug!("could not list tesseract languages: {err}");
                return Ok(self);
            }
        };
        self.options.languages = normalize_languages(&self.options.languages, &available)?;
        Ok(self)
    }

    async fn run_tsv(&self, image: &[u8], psm: u32) -> Result<String> {
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        tmp.write_all(image)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush()
            .with_context(|| "failed to flush temp image for OCR")?;

        let output = Command::new(&self.executable)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.languages)
            .arg("--oem")
            .arg("1")
            .arg("--psm")
            .arg(psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.options.char_whitelist))
            .arg("-c")
            .arg("load_system_dawg=0")
            .arg("-c")
            .arg("load_freq_dawg=0")
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| "failed to run tesseract (is it installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn detect_regions<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<Quad>> {
        Box::pin(async move {
            // Sparse mode finds every line, not only the dominant one.
            let tsv = self.run_tsv(image, 11).await?;
            Ok(parse_tsv_regions(&tsv))
        })
    }

    fn extract_text<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<TextCandidate>> {
        Box::pin(async move {
            let tsv = self.run_tsv(image, self.options.psm).await?;
            Ok(parse_tsv_candidates(&tsv))
        })
    }
}

pub async fn list_tesseract_languages(executable: &Path) -> Result<Vec<String>> {
    let output = Command::new(executable)
        .arg("--list-langs")
        .output()
        .await
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_languages(requested: &str, available: &[String]) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in trimmed.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}
