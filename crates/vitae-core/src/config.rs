use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ingest::SectionKind;

/// Tuning knobs for the extraction pipeline. Every field is optional in
/// serialized form and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Allow OCR for images and for PDFs without a usable text layer
    pub ocr_enabled: bool,
    /// Non-whitespace characters below which a PDF is treated as scanned
    pub min_text_chars_for_ocr_fallback: usize,
    /// Replaces the trigger phrases of each listed section kind
    pub section_keyword_overrides: BTreeMap<SectionKind, BTreeSet<String>>,
    /// Extracted fields scoring below this are dropped before assembly
    pub confidence_threshold: f64,
    /// Upper bound for document loading, OCR included
    pub load_timeout_seconds: u64,
    /// Tesseract language code
    pub ocr_language: String,
    /// Resolution used when rasterizing scanned PDF pages
    pub ocr_dpi: u32,
    /// Explicit tesseract executable (looked up on PATH when unset)
    pub tesseract_cmd: Option<PathBuf>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            min_text_chars_for_ocr_fallback: 50,
            section_keyword_overrides: BTreeMap::new(),
            confidence_threshold: 0.3,
            load_timeout_seconds: 120,
            ocr_language: "eng".to_string(),
            ocr_dpi: 300,
            tesseract_cmd: None,
        }
    }
}

impl ParserConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_seconds)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Layer `VITAE_*` environment variables over this configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("VITAE_OCR_ENABLED") {
            self.ocr_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(n) = lookup("VITAE_MIN_TEXT_CHARS").and_then(|v| v.parse().ok()) {
            self.min_text_chars_for_ocr_fallback = n;
        }
        if let Some(t) = lookup("VITAE_CONFIDENCE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.confidence_threshold = t;
        }
        if let Some(s) = lookup("VITAE_LOAD_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.load_timeout_seconds = s;
        }
        if let Some(lang) = lookup("VITAE_OCR_LANGUAGE").filter(|v| !v.is_empty()) {
            self.ocr_language = lang;
        }
        if let Some(cmd) = lookup("VITAE_TESSERACT_CMD").filter(|v| !v.is_empty()) {
            self.tesseract_cmd = Some(PathBuf::from(cmd));
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.confidence_threshold));
        }
        if self.load_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.ocr_dpi == 0 {
            return Err(ConfigError::ZeroDpi);
        }
        for (kind, phrases) in &self.section_keyword_overrides {
            if phrases.iter().all(|p| p.trim().is_empty()) {
                return Err(ConfigError::EmptyKeywordSet(*kind));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("confidence_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("load_timeout_seconds must be greater than zero")]
    ZeroTimeout,
    #[error("ocr_dpi must be greater than zero")]
    ZeroDpi,
    #[error("keyword override for {0} has no phrases")]
    EmptyKeywordSet(SectionKind),
    #[error("cannot read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
    #[error("invalid config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}
