use std::sync::LazyLock;

use regex::Regex;

use crate::ingest::dates::find_date_range;
use crate::ingest::entries::{
    group_entries, is_location, join_description, starts_dated_entry, trim_separators,
    without_span,
};
use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionKind;
use crate::record::{DateRange, ExperienceEntry};

static JOB_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            engineer|developer|programmer|manager|analyst|intern|scientist|designer|consultant
          | director|lead|architect|specialist|coordinator|administrator|officer|assistant
          | associate|president|head|founder|co-founder|technician|researcher|fellow|editor
          | writer|teacher|professor|instructor|accountant|supervisor|representative
          | executive|vp|cto|ceo|cfo|coo
        )s?\b",
    )
    .expect("valid regex")
});

static COMPANY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            inc|llc|llp|ltd|corp|corporation|company|co|gmbh|plc|technologies|technology|tech
          | solutions|systems|labs|group|software|consulting|partners|bank|agency|studios?
          | analytics|industries|ventures|holdings|university|hospital
        )\b",
    )
    .expect("valid regex")
});

/// Separators that split "Title | Company" style one-line headers.
static HEADER_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+\|\s+|\s+at\s+|\s+@\s+|\s+[–—-]\s+").expect("valid regex")
});

const BASE_CONFIDENCE: f64 = 0.35;

/// Header lines considered for title, company and dates before the
/// description. Location lines are not counted.
const MAX_HEADER_LINES: usize = 3;

pub struct ExperienceExtractor;

impl ExperienceExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn entry(group: &[Line]) -> Option<ExperienceEntry> {
        let mut date_range: Option<DateRange> = None;
        let mut date_line = None;
        // (position in group, text with any date removed)
        let mut texts: Vec<(usize, String)> = Vec::new();
        let mut locations: Vec<usize> = Vec::new();
        let mut header_lines = 0;

        for (pos, line) in group.iter().enumerate() {
            if line.is_bullet() {
                break;
            }
            if is_location(line.content()) && !looks_like_company(line.content()) {
                locations.push(pos);
                continue;
            }
            if header_lines == MAX_HEADER_LINES {
                break;
            }
            header_lines += 1;

            let mut text = line.content().to_string();
            if date_range.is_none() {
                if let Some(found) = find_date_range(&text) {
                    date_range = Some(found.range);
                    date_line = Some(pos);
                    text = without_span(&text, found.span);
                }
            }
            if !text.is_empty() && texts.len() < 2 {
                texts.push((pos, text));
            }
        }

        let (title, company) = match texts.as_slice() {
            [] => return None,
            [(_, only)] => split_single_header(only),
            [(pos_a, a), (pos_b, b), ..] => {
                let date_beside = |pos: usize| date_line == Some(pos);
                let swap = match (looks_like_title(a), looks_like_title(b)) {
                    (false, true) => true,
                    (true, false) => false,
                    _ => match (looks_like_company(a), looks_like_company(b)) {
                        (true, false) => true,
                        (false, true) => false,
                        // A date sharing the first line marks "Company  Dates"
                        // over "Title" layouts.
                        _ => date_beside(*pos_a) && !date_beside(*pos_b),
                    },
                };
                let (a, b) = (first_piece(a), first_piece(b));
                if swap {
                    (Some(b), Some(a))
                } else {
                    (Some(a), Some(b))
                }
            }
        };

        let used_end = texts
            .iter()
            .map(|(pos, _)| pos + 1)
            .chain(date_line.map(|p| p + 1))
            .max()
            .unwrap_or(0);
        let description = join_description(
            group
                .iter()
                .enumerate()
                .skip(used_end)
                .filter(|(pos, _)| !locations.contains(pos))
                .map(|(_, line)| line),
        );

        Some(ExperienceEntry {
            title,
            company,
            date_range,
            description,
        })
    }

    fn confidence(entry: &ExperienceEntry) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if entry.title.is_some() {
            confidence += 0.2;
        }
        if entry.company.is_some() {
            confidence += 0.2;
        }
        if entry.date_range.is_some() {
            confidence += 0.2;
        }
        if entry.description.is_some() {
            confidence += 0.05;
        }
        confidence
    }
}

impl Default for ExperienceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ExperienceExtractor {
    fn name(&self) -> &'static str {
        "experience"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Section(SectionKind::Experience)
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        group_entries(lines, starts_dated_entry)
            .into_iter()
            .filter_map(|group| {
                let entry = Self::entry(group)?;
                let confidence = Self::confidence(&entry);
                Some(ExtractedField::new(
                    FieldValue::Experience(entry),
                    confidence,
                    group.iter().map(|l| l.index),
                ))
            })
            .collect()
    }
}

fn looks_like_title(text: &str) -> bool {
    JOB_TITLE.is_match(text)
}

fn looks_like_company(text: &str) -> bool {
    COMPANY_SUFFIX.is_match(text) && !JOB_TITLE.is_match(text)
}

/// Text before a " | " separator, so trailing locations are dropped.
fn first_piece(text: &str) -> String {
    text.split(" | ")
        .map(trim_separators)
        .find(|p| !p.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Title and company from a single header line such as "Engineer at Acme".
fn split_single_header(text: &str) -> (Option<String>, Option<String>) {
    let split = HEADER_SPLIT
        .find(text)
        .map(|m| (&text[..m.start()], &text[m.end()..]))
        .or_else(|| text.split_once(", "));

    let Some((first, second)) = split else {
        let text = trim_separators(text).to_string();
        return if looks_like_company(&text) {
            (None, Some(text))
        } else {
            (Some(text), None)
        };
    };

    let (first, second) = (first_piece(first), first_piece(second));
    let swap = !looks_like_title(&first) && looks_like_title(&second);
    let (title, company) = if swap { (second, first) } else { (first, second) };
    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    (non_empty(title), non_empty(company))
}
