use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::ocr::{OcrEngine, TesseractOcr};
use crate::config::ParserConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Pdf,
    Docx,
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" | "rst" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "text/plain" => Some(Self::PlainText),
            "text/markdown" => Some(Self::Markdown),
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/tiff" => Some(Self::Tiff),
            "image/bmp" => Some(Self::Bmp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Sniff the format from leading magic bytes, falling back to text.
    pub fn detect(data: &[u8]) -> Option<Self> {
        const SIGNATURES: &[(&[u8], DocumentFormat)] = &[
            (b"%PDF", DocumentFormat::Pdf),
            (b"PK\x03\x04", DocumentFormat::Docx),
            (b"\x89PNG\r\n\x1a\n", DocumentFormat::Png),
            (b"\xff\xd8\xff", DocumentFormat::Jpeg),
            (b"II*\x00", DocumentFormat::Tiff),
            (b"MM\x00*", DocumentFormat::Tiff),
            (b"GIF87a", DocumentFormat::Gif),
            (b"GIF89a", DocumentFormat::Gif),
        ];

        if let Some((_, format)) = SIGNATURES.iter().find(|(sig, _)| data.starts_with(sig)) {
            return Some(*format);
        }
        // "BM" alone is too common at the start of text; the reserved header
        // bytes of a bitmap are zero.
        if data.len() >= 14 && data.starts_with(b"BM") && data[6..10] == [0; 4] {
            return Some(Self::Bmp);
        }

        if !data.contains(&0) && std::str::from_utf8(data).is_ok() {
            return Some(Self::PlainText);
        }
        None
    }

    /// Resolve from an extension or MIME hint, sniffing the bytes when no
    /// hint is given. An unrecognized hint is never second-guessed.
    pub fn resolve(hint: Option<&str>, data: &[u8]) -> Result<Self> {
        match hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hint) => {
                let format = if hint.contains('/') {
                    Self::from_mime(hint)
                } else {
                    Self::from_extension(hint)
                };
                format.ok_or_else(|| Error::UnsupportedFormat(hint.to_string()))
            }
            None => Self::detect(data)
                .ok_or_else(|| Error::UnsupportedFormat("unrecognized content".into())),
        }
    }

    #[must_use]
    pub const fn is_image(self) -> bool {
        matches!(
            self,
            Self::Png | Self::Jpeg | Self::Tiff | Self::Bmp | Self::Gif
        )
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which part of loading was running when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    TextLayer,
    Ocr,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextLayer => f.write_str("text-layer extraction"),
            Self::Ocr => f.write_str("OCR"),
        }
    }
}

/// Where the text of a loaded document came from. OCR text is less
/// trustworthy and downstream confidences are scaled accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    TextLayer,
    Ocr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub format: DocumentFormat,
    pub text: String,
    pub source: TextSource,
    pub page_count: Option<u32>,
}

impl LoadedDocument {
    #[must_use]
    pub fn new(format: DocumentFormat, text: String, source: TextSource) -> Self {
        Self {
            format,
            // Page breaks are line breaks as far as extraction cares.
            text: text.replace('\u{c}', "\n"),
            source,
            page_count: None,
        }
    }

    #[must_use]
    pub const fn with_page_count(mut self, count: u32) -> Self {
        self.page_count = Some(count);
        self
    }

    pub fn significant_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

#[async_trait::async_trait]
pub trait Loader: Send + Sync {
    fn supported_formats(&self) -> &[DocumentFormat];

    fn can_load(&self, format: DocumentFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    async fn load_bytes(&self, data: &[u8], format: DocumentFormat) -> Result<LoadedDocument>;

    async fn load_file(&self, path: &Path) -> Result<LoadedDocument> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat("no extension".into()))?;

        let format = DocumentFormat::from_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(ext.into()))?;

        if !self.can_load(format) {
            return Err(Error::UnsupportedFormat(format.to_string()));
        }

        let data = tokio::fs::read(path).await?;
        self.load_bytes(&data, format).await
    }
}

pub struct PlainTextLoader;

impl PlainTextLoader {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PlainTextLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Loader for PlainTextLoader {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::PlainText, DocumentFormat::Markdown]
    }

    async fn load_bytes(&self, data: &[u8], format: DocumentFormat) -> Result<LoadedDocument> {
        let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
        let text = match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!(valid_up_to = e.valid_up_to(), "text is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(data).into_owned()
            }
        };
        Ok(LoadedDocument::new(format, text, TextSource::TextLayer))
    }
}

pub struct PdfLoader;

impl PdfLoader {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Loader for PdfLoader {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    async fn load_bytes(&self, data: &[u8], format: DocumentFormat) -> Result<LoadedDocument> {
        let owned = data.to_vec();
        // The decoder can panic on malformed input; the join error catches it.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| Error::extraction(format, LoadStage::TextLayer, e))?
            .map_err(|e| Error::extraction(format, LoadStage::TextLayer, e))?;

        Ok(LoadedDocument::new(format, text, TextSource::TextLayer))
    }
}

#[derive(Debug, thiserror::Error)]
enum DocxError {
    #[error("not a docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct DocxLoader;

impl DocxLoader {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for DocxLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Loader for DocxLoader {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx]
    }

    async fn load_bytes(&self, data: &[u8], format: DocumentFormat) -> Result<LoadedDocument> {
        let owned = data.to_vec();
        let text = tokio::task::spawn_blocking(move || read_docx(&owned))
            .await
            .map_err(|e| Error::extraction(format, LoadStage::TextLayer, e))?
            .map_err(|e| Error::extraction(format, LoadStage::TextLayer, e))?;

        Ok(LoadedDocument::new(format, text, TextSource::TextLayer))
    }
}

/// Header parts first (contact details often live there), then the body,
/// then footers.
fn read_docx(data: &[u8]) -> std::result::Result<String, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let part_names = |prefix: &str| {
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
            .map(String::from)
            .collect();
        names.sort();
        names
    };
    let headers = part_names("word/header");
    let footers = part_names("word/footer");

    let mut text = String::new();
    for part in headers
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("word/document.xml"))
        .chain(footers.iter().map(String::as_str))
    {
        let mut xml = String::new();
        archive.by_name(part)?.read_to_string(&mut xml)?;
        text.push_str(&wordprocessing_text(&xml)?);
        text.push('\n');
    }
    Ok(text)
}

fn wordprocessing_text(xml: &str) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => out.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) if in_text => {
                if let Some(c) = e.resolve_char_ref()? {
                    out.push(c);
                } else if let Some(entity) =
                    resolve_predefined_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    out.push_str(entity);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Picks a loader by format, falls back to OCR for scanned input, and bounds
/// the whole operation by a timeout.
pub struct DocumentLoader {
    loaders: Vec<Box<dyn Loader>>,
    ocr: Option<Box<dyn OcrEngine>>,
    min_text_chars: usize,
    timeout: Duration,
}

impl DocumentLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
            ocr: None,
            min_text_chars: ParserConfig::default().min_text_chars_for_ocr_fallback,
            timeout: ParserConfig::default().load_timeout(),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        let mut loader = Self::new()
            .with_loader(Box::new(PlainTextLoader::new()))
            .with_loader(Box::new(PdfLoader::new()))
            .with_loader(Box::new(DocxLoader::new()))
            .with_min_text_chars(config.min_text_chars_for_ocr_fallback)
            .with_timeout(config.load_timeout());

        if config.ocr_enabled {
            loader = loader.with_ocr(Box::new(TesseractOcr::from_config(config)));
        }
        loader
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    #[must_use]
    pub fn with_ocr(mut self, ocr: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    #[must_use]
    pub const fn with_min_text_chars(mut self, chars: usize) -> Self {
        self.min_text_chars = chars;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn find_loader(&self, format: DocumentFormat) -> Option<&dyn Loader> {
        self.loaders
            .iter()
            .find(|l| l.can_load(format))
            .map(AsRef::as_ref)
    }

    pub async fn load(&self, data: &[u8], hint: Option<&str>) -> Result<LoadedDocument> {
        let format = DocumentFormat::resolve(hint, data)?;
        let in_ocr = AtomicBool::new(false);

        match tokio::time::timeout(self.timeout, self.load_resolved(data, format, &in_ocr)).await {
            Ok(result) => result,
            Err(_) => {
                let stage = if in_ocr.load(Ordering::SeqCst) {
                    LoadStage::Ocr
                } else {
                    LoadStage::TextLayer
                };
                Err(Error::Timeout {
                    format,
                    stage,
                    after: self.timeout,
                })
            }
        }
    }

    pub async fn load_file(&self, path: &Path) -> Result<LoadedDocument> {
        let data = tokio::fs::read(path).await?;
        let hint = path.extension().and_then(|e| e.to_str());
        self.load(&data, hint).await
    }

    async fn load_resolved(
        &self,
        data: &[u8],
        format: DocumentFormat,
        in_ocr: &AtomicBool,
    ) -> Result<LoadedDocument> {
        if format.is_image() {
            let ocr = self
                .ocr
                .as_ref()
                .ok_or_else(|| Error::UnsupportedFormat(format!("{format} (OCR disabled)")))?;
            in_ocr.store(true, Ordering::SeqCst);
            let text = ocr.recognize_image(data, format).await?;
            return Ok(LoadedDocument::new(format, text, TextSource::Ocr).with_page_count(1));
        }

        let loader = self
            .find_loader(format)
            .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))?;
        let document = loader.load_bytes(data, format).await?;
        let chars = document.significant_chars();
        debug!(%format, chars, "loaded text layer");

        if format != DocumentFormat::Pdf || chars >= self.min_text_chars {
            return Ok(document);
        }
        let Some(ocr) = &self.ocr else {
            debug!(chars, "sparse text layer but OCR is disabled");
            return Ok(document);
        };

        info!(chars, threshold = self.min_text_chars, "text layer looks scanned, running OCR");
        in_ocr.store(true, Ordering::SeqCst);
        match ocr.recognize_pdf(data).await {
            Ok(pages) => {
                let count = u32::try_from(pages.len()).unwrap_or(u32::MAX);
                Ok(LoadedDocument::new(format, pages.join("\n"), TextSource::Ocr)
                    .with_page_count(count))
            }
            Err(e) if chars > 0 => {
                warn!(error = %e, "OCR failed, keeping the sparse text layer");
                Ok(document)
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}
