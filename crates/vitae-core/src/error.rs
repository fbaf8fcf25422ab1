use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::{DocumentFormat, LoadStage};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed for {format} during {stage}: {cause}")]
    ExtractionFailure {
        format: DocumentFormat,
        stage: LoadStage,
        cause: String,
    },

    #[error("Timed out after {}s during {stage} of {format}", after.as_secs())]
    Timeout {
        format: DocumentFormat,
        stage: LoadStage,
        after: Duration,
    },

    #[error("Invalid section kind: {0}")]
    InvalidSectionKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn extraction(format: DocumentFormat, stage: LoadStage, cause: impl ToString) -> Self {
        Self::ExtractionFailure {
            format,
            stage,
            cause: cause.to_string(),
        }
    }

    /// Whether retrying the same input could succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_stage_context() {
        let err = Error::extraction(DocumentFormat::Pdf, LoadStage::TextLayer, "file is encrypted");
        assert_eq!(
            err.to_string(),
            "Extraction failed for pdf during text-layer extraction: file is encrypted"
        );

        let err = Error::Timeout {
            format: DocumentFormat::Png,
            stage: LoadStage::Ocr,
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Timed out after 30s during OCR of png");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unsupported_is_not_retryable() {
        let err = Error::UnsupportedFormat("xyz".into());
        assert!(!err.is_retryable());
    }
}
