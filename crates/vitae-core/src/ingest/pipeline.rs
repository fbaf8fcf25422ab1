use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::assembler::RecordAssembler;
use super::extractor::CompositeExtractor;
use super::loader::{DocumentFormat, DocumentLoader, LoadedDocument, TextSource};
use super::normalizer::normalize;
use super::segmenter::{Section, SectionKind, Segmenter};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::record::ResumeRecord;

/// Confidence multiplier for fields read from OCR output.
const OCR_CONFIDENCE_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub lines: usize,
    pub sections: usize,
    pub fields_extracted: usize,
    pub fields_kept: usize,
    pub duration_ms: u64,
}

impl ParseStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: 0,
            sections: 0,
            fields_extracted: 0,
            fields_kept: 0,
            duration_ms: 0,
        }
    }

    fn add(&mut self, other: &Self) {
        self.lines += other.lines;
        self.sections += other.sections;
        self.fields_extracted += other.fields_extracted;
        self.fields_kept += other.fields_kept;
        self.duration_ms += other.duration_ms;
    }
}

/// Where a section sits, without its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub kind: SectionKind,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl From<&Section> for SectionSummary {
    fn from(section: &Section) -> Self {
        Self {
            kind: section.kind,
            start_line: section.start_line,
            end_line: section.end_line,
            header: section.header.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutput {
    pub record: ResumeRecord,
    pub sections: Vec<SectionSummary>,
    pub text_source: TextSource,
    pub format: DocumentFormat,
    pub stats: ParseStats,
}

/// Loader, normalizer, segmenter, extractors and assembler wired together.
/// Holds no per-document state, so one instance can serve concurrent calls.
pub struct ResumePipeline {
    loader: DocumentLoader,
    segmenter: Segmenter,
    extractor: CompositeExtractor,
    assembler: RecordAssembler,
}

impl ResumePipeline {
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &ParserConfig) -> Self {
        let segmenter = Segmenter::from_config(config);
        let extractor = CompositeExtractor::with_vocabulary(segmenter.vocabulary().clone());
        Self {
            loader: DocumentLoader::from_config(config),
            segmenter,
            extractor,
            assembler: RecordAssembler::from_config(config),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: CompositeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub const fn with_assembler(mut self, assembler: RecordAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// `hint` is a file extension or MIME type; without one the format is
    /// sniffed from the bytes.
    pub async fn parse_bytes(&self, data: &[u8], hint: Option<&str>) -> Result<ParseOutput> {
        let start = Instant::now();
        let document = self.loader.load(data, hint).await?;
        Ok(self.process(document, start))
    }

    pub async fn parse_file(&self, path: &Path) -> Result<ParseOutput> {
        let start = Instant::now();
        let document = self.loader.load_file(path).await?;
        Ok(self.process(document, start))
    }

    /// Runs everything after loading. Text input cannot fail.
    pub fn parse_text(&self, text: &str) -> ParseOutput {
        let document =
            LoadedDocument::new(DocumentFormat::PlainText, text.to_string(), TextSource::TextLayer);
        self.process(document, Instant::now())
    }

    fn process(&self, document: LoadedDocument, start: Instant) -> ParseOutput {
        let normalized = normalize(&document.text);
        let sections = self.segmenter.segment(&normalized);

        let mut fields = self.extractor.extract(&normalized, &sections);
        if document.source == TextSource::Ocr {
            fields = fields
                .into_iter()
                .map(|f| f.scaled(OCR_CONFIDENCE_FACTOR))
                .collect();
        }
        let fields_extracted = fields.len();

        let (record, assembly) = self.assembler.assemble_with_stats(fields);

        let stats = ParseStats {
            lines: normalized.len(),
            sections: sections.len(),
            fields_extracted,
            fields_kept: assembly.accepted,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            format = %document.format,
            source = ?document.source,
            lines = stats.lines,
            sections = stats.sections,
            fields = stats.fields_kept,
            "parsed resume"
        );

        ParseOutput {
            record,
            sections: sections.iter().map(SectionSummary::from).collect(),
            text_source: document.source,
            format: document.format,
            stats,
        }
    }
}

impl Default for ResumePipeline {
    fn default() -> Self {
        Self::build(&ParserConfig::default())
    }
}

pub struct BatchParseResult {
    pub successful: Vec<(PathBuf, ParseOutput)>,
    pub failed: Vec<(PathBuf, Error)>,
    pub total_stats: ParseStats,
}

impl BatchParseResult {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            total_stats: ParseStats::new(),
        }
    }

    fn add_success(&mut self, path: PathBuf, output: ParseOutput) {
        self.total_stats.add(&output.stats);
        self.successful.push((path, output));
    }

    fn add_failure(&mut self, path: PathBuf, error: Error) {
        self.failed.push((path, error));
    }

    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

impl Default for BatchParseResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumePipeline {
    /// Parses every regular file directly inside `dir`, in name order. One
    /// unreadable file does not stop the rest.
    pub async fn parse_directory(&self, dir: &Path) -> Result<BatchParseResult> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(dir = %dir.display(), files = paths.len(), "parsing directory");

        let paths: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        Ok(self.parse_files(&paths).await)
    }

    pub async fn parse_files(&self, paths: &[&Path]) -> BatchParseResult {
        let mut result = BatchParseResult::new();

        for path in paths {
            match self.parse_file(path).await {
                Ok(output) => result.add_success(path.to_path_buf(), output),
                Err(e) => result.add_failure(path.to_path_buf(), e),
            }
        }

        result
    }
}
