use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extractor::{ExtractedField, FieldKind, FieldValue};
use crate::config::ParserConfig;
use crate::record::{DateRange, ResumeRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Fields that ended up in the record
    pub accepted: usize,
    /// Fields dropped for scoring under the confidence threshold
    pub below_threshold: usize,
    /// Repeated values plus losing candidates for single-valued fields
    pub duplicates: usize,
}

/// Folds extracted fields into one [`ResumeRecord`]. Never fails: an empty
/// input yields an empty record.
#[derive(Debug, Clone, Copy)]
pub struct RecordAssembler {
    confidence_threshold: f64,
}

impl RecordAssembler {
    #[must_use]
    pub const fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub const fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    pub fn assemble(&self, fields: Vec<ExtractedField>) -> ResumeRecord {
        self.assemble_with_stats(fields).0
    }

    pub fn assemble_with_stats(&self, fields: Vec<ExtractedField>) -> (ResumeRecord, AssemblyStats) {
        let mut stats = AssemblyStats::default();
        let total = fields.len();

        let mut fields: Vec<ExtractedField> = fields
            .into_iter()
            .filter(|f| f.confidence >= self.confidence_threshold)
            .collect();
        stats.below_threshold = total - fields.len();

        // Stable, so fields from the same line keep extractor order.
        fields.sort_by_key(ExtractedField::first_line);

        let mut record = ResumeRecord::default();
        let mut name: Option<&ExtractedField> = None;
        let mut linkedin: Option<&ExtractedField> = None;
        let mut seen: HashSet<(FieldKind, String)> = HashSet::new();

        for field in &fields {
            let slot = match field.kind() {
                FieldKind::Name => Some(&mut name),
                FieldKind::LinkedIn => Some(&mut linkedin),
                _ => None,
            };
            if let Some(slot) = slot {
                // Earlier lines win ties because fields arrive in line order.
                if slot.is_none_or(|best| field.confidence > best.confidence) {
                    if slot.is_some() {
                        stats.duplicates += 1;
                    }
                    *slot = Some(field);
                } else {
                    stats.duplicates += 1;
                }
                continue;
            }

            if !seen.insert((field.kind(), dedup_key(&field.value))) {
                stats.duplicates += 1;
                continue;
            }
            stats.accepted += 1;

            match &field.value {
                FieldValue::Email(v) => record.email.push(v.clone()),
                FieldValue::Phone(v) => record.phone.push(v.clone()),
                FieldValue::Website(v) => record.websites.push(v.clone()),
                FieldValue::Skill(v) => record.skills.push(v.clone()),
                FieldValue::Education(e) => record.education.push(e.clone()),
                FieldValue::Experience(e) => record.experience.push(e.clone()),
                FieldValue::Project(p) => record.projects.push(p.clone()),
                FieldValue::Certification(c) => record.certifications.push(c.clone()),
                FieldValue::Name(_) | FieldValue::LinkedIn(_) => {}
            }
        }

        if let Some(FieldValue::Name(v)) = name.map(|f| &f.value) {
            record.name = Some(v.clone());
            stats.accepted += 1;
        }
        if let Some(FieldValue::LinkedIn(v)) = linkedin.map(|f| &f.value) {
            record.linkedin = Some(v.clone());
            stats.accepted += 1;
        }

        debug!(
            accepted = stats.accepted,
            below_threshold = stats.below_threshold,
            duplicates = stats.duplicates,
            "assembled record"
        );
        (record, stats)
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}

/// Normalised form used to decide whether two values are the same.
fn dedup_key(value: &FieldValue) -> String {
    match value {
        FieldValue::Name(v) | FieldValue::Email(v) | FieldValue::Skill(v) => {
            v.trim().to_lowercase()
        }
        FieldValue::Phone(v) => v.chars().filter(char::is_ascii_digit).collect(),
        FieldValue::Website(v) | FieldValue::LinkedIn(v) => url_key(v),
        FieldValue::Education(e) => join_key([
            e.institution.as_deref(),
            e.degree.as_deref(),
            range_key(e.date_range).as_deref(),
        ]),
        FieldValue::Experience(e) => join_key([
            e.title.as_deref(),
            e.company.as_deref(),
            range_key(e.date_range).as_deref(),
        ]),
        FieldValue::Project(p) => join_key([Some(p.name.as_str())]),
        FieldValue::Certification(c) => join_key([Some(c.name.as_str()), c.issuer.as_deref()]),
    }
}

fn url_key(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

fn range_key(range: Option<DateRange>) -> Option<String> {
    range.map(|r| r.to_string())
}

fn join_key<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .map(|p| p.unwrap_or_default().trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}
