use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extractors::{
    CertificationsExtractor, ContactExtractor, EducationExtractor, ExperienceExtractor,
    ProjectsExtractor, SkillsExtractor,
};
use super::normalizer::{Line, NormalizedText};
use super::segmenter::{Section, SectionKind, SectionVocabulary};
use crate::record::{CertificationEntry, EducationEntry, ExperienceEntry, ProjectEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Name(String),
    Email(String),
    Phone(String),
    Website(String),
    #[serde(rename = "linkedin")]
    LinkedIn(String),
    Education(EducationEntry),
    Experience(ExperienceEntry),
    Skill(String),
    Project(ProjectEntry),
    Certification(CertificationEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    Email,
    Phone,
    Website,
    #[serde(rename = "linkedin")]
    LinkedIn,
    Education,
    Experience,
    Skill,
    Project,
    Certification,
}

impl FieldKind {
    /// Kinds where the record keeps one winner rather than a list.
    pub const fn is_single_valued(self) -> bool {
        matches!(self, Self::Name | Self::LinkedIn)
    }
}

impl FieldValue {
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Name(_) => FieldKind::Name,
            Self::Email(_) => FieldKind::Email,
            Self::Phone(_) => FieldKind::Phone,
            Self::Website(_) => FieldKind::Website,
            Self::LinkedIn(_) => FieldKind::LinkedIn,
            Self::Education(_) => FieldKind::Education,
            Self::Experience(_) => FieldKind::Experience,
            Self::Skill(_) => FieldKind::Skill,
            Self::Project(_) => FieldKind::Project,
            Self::Certification(_) => FieldKind::Certification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: FieldValue,
    pub confidence: f64,
    pub source_lines: BTreeSet<usize>,
}

impl ExtractedField {
    #[must_use]
    pub fn new(value: FieldValue, confidence: f64, source_lines: impl IntoIterator<Item = usize>) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source_lines: source_lines.into_iter().collect(),
        }
    }

    pub const fn kind(&self) -> FieldKind {
        self.value.kind()
    }

    /// Earliest line this field was read from.
    pub fn first_line(&self) -> usize {
        self.source_lines.first().copied().unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        self.confidence = (self.confidence * factor).clamp(0.0, 1.0);
        self
    }
}

/// What an extractor reads: the whole document or every section of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorScope {
    Document,
    Section(SectionKind),
}

pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn scope(&self) -> ExtractorScope;

    /// `lines` are the scoped lines; `document` is the full text for
    /// extractors that need surrounding context.
    fn extract(&self, lines: &[Line], document: &NormalizedText) -> Vec<ExtractedField>;
}

pub struct CompositeExtractor {
    extractors: Vec<Box<dyn FieldExtractor>>,
}

impl CompositeExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Every built-in extractor, with header phrases from `vocabulary` kept
    /// out of name candidates.
    #[must_use]
    pub fn with_vocabulary(vocabulary: SectionVocabulary) -> Self {
        Self::new()
            .with_extractor(Box::new(ContactExtractor::new(vocabulary)))
            .with_extractor(Box::new(EducationExtractor::new()))
            .with_extractor(Box::new(ExperienceExtractor::new()))
            .with_extractor(Box::new(SkillsExtractor::new()))
            .with_extractor(Box::new(ProjectsExtractor::new()))
            .with_extractor(Box::new(CertificationsExtractor::new()))
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn FieldExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn extract(&self, document: &NormalizedText, sections: &[Section]) -> Vec<ExtractedField> {
        let mut combined = Vec::new();

        for extractor in &self.extractors {
            let before = combined.len();
            match extractor.scope() {
                ExtractorScope::Document => {
                    combined.extend(extractor.extract(document.lines(), document));
                }
                ExtractorScope::Section(kind) => {
                    for section in sections.iter().filter(|s| s.kind == kind) {
                        combined.extend(extractor.extract(&section.lines, document));
                    }
                }
            }
            debug!(
                extractor = extractor.name(),
                fields = combined.len() - before,
                "ran extractor"
            );
        }

        combined
    }
}

impl Default for CompositeExtractor {
    fn default() -> Self {
        Self::with_vocabulary(SectionVocabulary::default())
    }
}
