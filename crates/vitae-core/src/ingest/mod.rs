mod assembler;
mod dates;
mod entries;
mod extractor;
pub mod extractors;
mod loader;
mod normalizer;
mod ocr;
mod pipeline;
mod segmenter;

pub use assembler::{AssemblyStats, RecordAssembler};
pub use dates::{find_date_range, parse_date_range, DateRangeMatch};
pub use extractor::{
    CompositeExtractor, ExtractedField, ExtractorScope, FieldExtractor, FieldKind, FieldValue,
};
pub use loader::{
    DocumentFormat, DocumentLoader, DocxLoader, LoadStage, LoadedDocument, Loader, PdfLoader,
    PlainTextLoader, TextSource,
};
pub use normalizer::{normalize, Line, NormalizedText, BULLET_MARKER};
pub use ocr::{OcrEngine, TesseractOcr};
pub use pipeline::{BatchParseResult, ParseOutput, ParseStats, ResumePipeline, SectionSummary};
pub use segmenter::{Section, SectionKind, SectionVocabulary, Segmenter};
