use std::sync::LazyLock;

use regex::Regex;

use crate::ingest::dates::find_date_range;
use crate::ingest::entries::{group_entries, segments, trim_separators, without_span};
use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionKind;
use crate::record::EducationEntry;

static DEGREE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:
            bachelor(?:['’]?s)? | master(?:['’]?s)? | doctor(?:ate)? | diploma | high\s+school
          | associate(?:['’]?s)?\s+(?:of|in|degree)
          | ph\.?\s?d | b\.?\s?tech | m\.?\s?tech
          | b\.\s?sc? | b\.\s?a | b\.\s?e | m\.\s?sc? | m\.\s?a | m\.\s?e | m\.\s?b\.\s?a
          | (?-i:BS|BSc|BA|BE|MS|MSc|MA|ME|MBA|PhD|HSC|SSC)
        )(?:\.|\b)",
    )
    .expect("valid regex")
});

static INSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:university|universit[éy]|college|institute|school|academy|polytechnic|conservatory|vidyalaya)\b",
    )
    .expect("valid regex")
});

static GPA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:c?gpa|grade\s+point\s+average)\s*[:\-]?\s*
            (?P<gpa>\d+(?:\.\d+)?(?:\s*/\s*\d+(?:\.\d+)?)?)
      | (?P<percent>\d{2,3}(?:\.\d+)?\s*%)",
    )
    .expect("valid regex")
});

const BASE_CONFIDENCE: f64 = 0.4;

pub struct EducationExtractor;

impl EducationExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn entry(group: &[Line]) -> Option<ExtractedField> {
        let mut entry = EducationEntry::default();
        let mut confidence = BASE_CONFIDENCE;

        let degree_pos = group.iter().position(|l| DEGREE.is_match(l.content()));
        if let Some(pos) = degree_pos {
            let (degree, institution) = split_degree_line(group[pos].content());
            entry.degree = degree;
            entry.institution = institution;
        }

        if entry.institution.is_none() {
            entry.institution = group
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != degree_pos)
                .find_map(|(_, l)| institution_in(l.content()));
        }
        if entry.institution.is_some() {
            confidence += 0.2;
        } else if let Some(pos) = degree_pos {
            entry.institution = adjacent_institution(group, pos);
            if entry.institution.is_some() {
                confidence += 0.1;
            }
        }

        if entry.degree.is_none() && entry.institution.is_none() {
            return None;
        }
        if entry.degree.is_some() {
            confidence += 0.25;
        }

        entry.date_range = group
            .iter()
            .find_map(|l| find_date_range(l.content()))
            .map(|m| m.range);
        if entry.date_range.is_some() {
            confidence += 0.1;
        }

        entry.gpa = group.iter().find_map(|l| gpa_in(l.content()));
        if entry.gpa.is_some() {
            confidence += 0.05;
        }

        Some(ExtractedField::new(
            FieldValue::Education(entry),
            confidence,
            group.iter().map(|l| l.index),
        ))
    }
}

impl Default for EducationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for EducationExtractor {
    fn name(&self) -> &'static str {
        "education"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Section(SectionKind::Education)
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        // A second degree line opens the next entry.
        let groups = group_entries(lines, |group, rest| {
            DEGREE.is_match(rest[0].content())
                && group.iter().any(|l| DEGREE.is_match(l.content()))
        });
        groups.into_iter().filter_map(Self::entry).collect()
    }
}

/// Line text with any date range and GPA removed.
fn strip_noise(text: &str) -> String {
    let text = match find_date_range(text) {
        Some(m) => without_span(text, m.span),
        None => text.to_string(),
    };
    let text = GPA.replace_all(&text, " ");
    trim_separators(&text).to_string()
}

/// Degree text and, when the same line names one, the institution.
fn split_degree_line(text: &str) -> (Option<String>, Option<String>) {
    let cleaned = strip_noise(text);
    let pieces = segments(&cleaned);

    let institution = pieces
        .iter()
        .find(|(_, piece)| INSTITUTION.is_match(piece) && !DEGREE.is_match(piece));

    let degree = match institution {
        Some((range, _)) if range.start > 0 => trim_separators(&cleaned[..range.start]),
        Some(_) => pieces
            .iter()
            .find(|(_, piece)| DEGREE.is_match(piece))
            .map_or("", |(_, piece)| *piece),
        None => cleaned.as_str(),
    };

    (
        non_empty(degree),
        institution.and_then(|(_, piece)| non_empty(piece)),
    )
}

fn institution_in(text: &str) -> Option<String> {
    let cleaned = strip_noise(text);
    segments(&cleaned)
        .into_iter()
        .find(|(_, piece)| INSTITUTION.is_match(piece))
        .and_then(|(_, piece)| non_empty(piece))
}

/// A capitalised line next to the degree line, for institutions without a
/// telltale keyword.
fn adjacent_institution(group: &[Line], degree_pos: usize) -> Option<String> {
    let neighbours = [degree_pos + 1, degree_pos.wrapping_sub(1)];
    neighbours.iter().filter_map(|&i| group.get(i)).find_map(|line| {
        if line.is_bullet() || DEGREE.is_match(line.content()) {
            return None;
        }
        let cleaned = strip_noise(line.content());
        let first = segments(&cleaned).into_iter().next()?.1.to_string();
        let capitalised = first.chars().next().is_some_and(char::is_uppercase);
        (capitalised && first.split_whitespace().count() <= 8).then_some(first)
    })
}

fn gpa_in(text: &str) -> Option<String> {
    let caps = GPA.captures(text)?;
    caps.name("gpa")
        .or_else(|| caps.name("percent"))
        .map(|m| m.as_str().split_whitespace().collect::<String>())
}

fn non_empty(text: &str) -> Option<String> {
    let text = trim_separators(text);
    (!text.is_empty()).then(|| text.to_string())
}
