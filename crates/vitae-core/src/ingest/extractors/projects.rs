use std::sync::LazyLock;

use regex::Regex;

use super::skills::{clean_token, split_outside_parens};
use crate::ingest::dates::find_date_range;
use crate::ingest::entries::{group_entries, starts_dated_entry, trim_separators, without_span};
use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionKind;
use crate::record::ProjectEntry;

static TECH_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^(?:
            technolog(?:y|ies)(?:\s+used)? | tech(?:nology)?\s+stack | stack | tools(?:\s+used)?
          | built\s+with | developed\s+(?:using|with) | implemented\s+(?:using|with)
        )\s*:?\s+(?P<list>.+)$",
    )
    .expect("valid regex")
});

static PROJECT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.|github\.com/|gitlab\.com/|bitbucket\.org/)[^\s,|()]+")
        .expect("valid regex")
});

const BASE_CONFIDENCE: f64 = 0.45;
const MAX_NAME_WORDS: usize = 12;
const MAX_INLINE_NAME_WORDS: usize = 6;

/// Projects with optional dates, technologies, link and description.
pub struct ProjectsExtractor;

impl ProjectsExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn entry(group: &[Line]) -> Option<ProjectEntry> {
        let name_pos = group
            .iter()
            .position(|l| !l.is_bullet() && !TECH_LABEL.is_match(l.content()))
            .unwrap_or(0);

        let mut entry = ProjectEntry {
            url: group
                .iter()
                .find_map(|l| PROJECT_URL.find(l.content()))
                .map(|m| m.as_str().trim_end_matches(['.', '/']).to_string()),
            ..ProjectEntry::default()
        };
        let mut description = Vec::new();

        let mut name_text = PROJECT_URL
            .replace_all(group[name_pos].content(), " ")
            .into_owned();
        if let Some(found) = find_date_range(&name_text) {
            entry.date_range = Some(found.range);
            name_text = without_span(&name_text, found.span);
        }
        let (name, rest) = split_name(&name_text, group[name_pos].is_bullet());
        entry.name = name.to_string();
        if let Some(rest) = rest {
            if looks_like_tech_list(rest) {
                entry.technologies.extend(tech_list(rest));
            } else {
                description.push(rest.to_string());
            }
        }

        for (pos, line) in group.iter().enumerate() {
            if pos == name_pos {
                continue;
            }
            if let Some(caps) = TECH_LABEL.captures(line.content()) {
                entry.technologies.extend(tech_list(&caps["list"]));
                continue;
            }
            let mut text = PROJECT_URL.replace_all(line.content(), " ").into_owned();
            if entry.date_range.is_none() {
                if let Some(found) = find_date_range(&text) {
                    entry.date_range = Some(found.range);
                    text = without_span(&text, found.span);
                }
            }
            let text = trim_separators(&text);
            if !text.is_empty() {
                description.push(text.to_string());
            }
        }

        if entry.name.is_empty() || entry.name.split_whitespace().count() > MAX_NAME_WORDS {
            return None;
        }
        dedup_case_insensitive(&mut entry.technologies);
        entry.description = (!description.is_empty()).then(|| description.join(" "));
        Some(entry)
    }

    fn confidence(entry: &ProjectEntry) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if entry.date_range.is_some() {
            confidence += 0.15;
        }
        if !entry.technologies.is_empty() {
            confidence += 0.15;
        }
        if entry.url.is_some() {
            confidence += 0.1;
        }
        if entry.description.is_some() {
            confidence += 0.15;
        }
        confidence
    }
}

impl Default for ProjectsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ProjectsExtractor {
    fn name(&self) -> &'static str {
        "projects"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Section(SectionKind::Projects)
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        let mut groups = Vec::new();
        let anchor = |group: &[Line], rest: &[Line]| {
            let line = rest[0].content();
            starts_dated_entry(group, rest) && !PROJECT_URL.is_match(line) && !TECH_LABEL.is_match(line)
        };
        for group in group_entries(lines, anchor) {
            // A list made only of bullets carries one project per bullet.
            if group.iter().all(Line::is_bullet) {
                groups.extend(group.chunks(1));
            } else {
                groups.push(group);
            }
        }

        groups
            .into_iter()
            .filter_map(|group| {
                let entry = Self::entry(group)?;
                let confidence = Self::confidence(&entry);
                Some(ExtractedField::new(
                    FieldValue::Project(entry),
                    confidence,
                    group.iter().map(|l| l.index),
                ))
            })
            .collect()
    }
}

/// Project name plus whatever follows a "|" (or, on bullet lines, a ":").
fn split_name(text: &str, bullet: bool) -> (&str, Option<&str>) {
    let split = text.split_once('|').or_else(|| {
        text.split_once(':')
            .filter(|(name, _)| bullet && name.split_whitespace().count() <= MAX_INLINE_NAME_WORDS)
    });
    match split {
        Some((name, rest)) => {
            let rest = trim_separators(rest);
            (trim_separators(name), (!rest.is_empty()).then_some(rest))
        }
        None => (trim_separators(text), None),
    }
}

fn looks_like_tech_list(text: &str) -> bool {
    let tokens = split_outside_parens(text);
    (tokens.len() > 1 && tokens.iter().all(|t| clean_token(t).is_some()))
        || TECH_LABEL.is_match(text)
}

fn tech_list(text: &str) -> Vec<String> {
    let text = TECH_LABEL
        .captures(text)
        .and_then(|caps| caps.name("list"))
        .map_or(text, |m| m.as_str());
    split_outside_parens(text)
        .into_iter()
        .filter_map(clean_token)
        .map(str::to_string)
        .collect()
}

fn dedup_case_insensitive(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.to_lowercase()));
}
