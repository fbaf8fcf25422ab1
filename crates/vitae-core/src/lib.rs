#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod record;

pub use config::{ConfigError, ParserConfig};
pub use error::{Error, Result};
pub use ingest::{
    BatchParseResult, DocumentFormat, DocumentLoader, LoadedDocument, NormalizedText, ParseOutput,
    ParseStats, ResumePipeline, Section, SectionKind, TextSource,
};
pub use record::{
    CertificationEntry, DateEnd, DateRange, EducationEntry, ExperienceEntry, PartialDate,
    ProjectEntry, ResumeRecord,
};
