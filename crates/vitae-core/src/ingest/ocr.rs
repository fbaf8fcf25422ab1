use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::loader::{DocumentFormat, LoadStage};
use crate::config::ParserConfig;
use crate::error::{Error, Result};

/// Turns raster input into text.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn recognize_image(&self, image: &[u8], format: DocumentFormat) -> Result<String>;

    /// Rasterize every page of a PDF and recognize each, in page order.
    async fn recognize_pdf(&self, pdf: &[u8]) -> Result<Vec<String>>;
}

/// Shells out to the `tesseract` CLI, and to `pdftoppm` for rasterizing
/// scanned PDFs. Missing binaries surface at recognition time.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: Option<PathBuf>,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            command: None,
            language: language.into(),
            dpi: 300,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        let ocr = Self::new(config.ocr_language.clone()).with_dpi(config.ocr_dpi);
        match &config.tesseract_cmd {
            Some(cmd) => ocr.with_command(cmd.clone()),
            None => ocr,
        }
    }

    #[must_use]
    pub fn with_command(mut self, command: PathBuf) -> Self {
        self.command = Some(command);
        self
    }

    #[must_use]
    pub const fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    fn tesseract(&self, format: DocumentFormat) -> Result<PathBuf> {
        if let Some(cmd) = &self.command {
            return Ok(cmd.clone());
        }
        which::which("tesseract").map_err(|_| {
            Error::extraction(format, LoadStage::Ocr, "tesseract executable not found on PATH")
        })
    }

    async fn recognize_path(&self, tesseract: &Path, input: &Path, format: DocumentFormat) -> Result<String> {
        let args = [
            input.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
        ];
        let stdout = run(tesseract, &args)
            .await
            .map_err(|cause| Error::extraction(format, LoadStage::Ocr, cause))?;
        Ok(stdout)
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize_image(&self, image: &[u8], format: DocumentFormat) -> Result<String> {
        let tesseract = self.tesseract(format)?;
        let dir = tempfile::tempdir()?;
        let input = dir.path().join(format!("input.{}", format.extension()));
        tokio::fs::write(&input, image).await?;

        debug!(%format, bytes = image.len(), "running tesseract on image");
        self.recognize_path(&tesseract, &input, format).await
    }

    async fn recognize_pdf(&self, pdf: &[u8]) -> Result<Vec<String>> {
        let format = DocumentFormat::Pdf;
        let tesseract = self.tesseract(format)?;
        let pdftoppm = which::which("pdftoppm").map_err(|_| {
            Error::extraction(format, LoadStage::Ocr, "pdftoppm executable not found on PATH")
        })?;

        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let prefix = dir.path().join("page");
        let dpi = self.dpi.to_string();
        let args = [
            OsStr::new("-r"),
            OsStr::new(&dpi),
            OsStr::new("-png"),
            input.as_os_str(),
            prefix.as_os_str(),
        ];
        run(&pdftoppm, &args)
            .await
            .map_err(|cause| Error::extraction(format, LoadStage::Ocr, cause))?;

        // pdftoppm zero-pads page numbers, so lexical order is page order.
        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("page") && name.ends_with(".png") {
                pages.push(entry.path());
            }
        }
        pages.sort();

        if pages.is_empty() {
            return Err(Error::extraction(format, LoadStage::Ocr, "PDF rasterized to zero pages"));
        }

        debug!(pages = pages.len(), dpi = self.dpi, "running tesseract on PDF pages");
        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            texts.push(self.recognize_path(&tesseract, page, format).await?);
        }
        Ok(texts)
    }
}

/// Run a tool to completion, returning stdout or a description of why it
/// failed. The child is killed if the caller's future is dropped.
async fn run(program: &Path, args: &[&OsStr]) -> std::result::Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {e}", program.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = ParserConfig {
            ocr_language: "deu".into(),
            ocr_dpi: 150,
            tesseract_cmd: Some(PathBuf::from("/opt/bin/tesseract")),
            ..Default::default()
        };
        let ocr = TesseractOcr::from_config(&config);

        assert_eq!(ocr.language, "deu");
        assert_eq!(ocr.dpi, 150);
        assert_eq!(
            ocr.tesseract(DocumentFormat::Png).unwrap(),
            PathBuf::from("/opt/bin/tesseract")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_failure() {
        let ocr = TesseractOcr::new("eng")
            .with_command(PathBuf::from("/nonexistent/vitae-test/tesseract"));
        let err = ocr
            .recognize_image(b"\x89PNG\r\n\x1a\n", DocumentFormat::Png)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ExtractionFailure {
                format: DocumentFormat::Png,
                stage: LoadStage::Ocr,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let Ok(false_bin) = which::which("false") else {
            return;
        };
        let err = run(&false_bin, &[]).await.unwrap_err();
        assert!(err.contains("exited with"));
    }
}
