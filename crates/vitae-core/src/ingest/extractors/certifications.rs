use std::sync::LazyLock;

use regex::Regex;

use crate::ingest::dates::find_date_range;
use crate::ingest::entries::{group_entries, segments, trim_separators, without_span};
use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionKind;
use crate::record::{CertificationEntry, PartialDate};

static ISSUER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            amazon\s+web\s+services | aws | microsoft | google | oracle | ibm | cisco | comptia
          | pmi | project\s+management\s+institute | salesforce | adobe | axelos | sap | hubspot
          | coursera | udemy | edx | linkedin\s+learning | pluralsight | freecodecamp | datacamp
          | kaggle | scrum\s+alliance | scrum\.org | isc2 | \(isc\)² | ec-council | isaca
          | linux\s+foundation | red\s+hat | hashicorp | geeksforgeeks | meta | nvidia
        )(?:\b|$)",
    )
    .expect("valid regex")
});

static ORGANIZATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:university|institute|academy|college|council|association|foundation)\b")
        .expect("valid regex")
});

static CERT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            certified|certification|certificate|license|licensed|licence|associate|professional
          | specialist|practitioner|expert|fundamentals|foundations|master|administrator
          | developer|engineer|architect|analyst|course|program|nanodegree
        )\b",
    )
    .expect("valid regex")
});

static CREDENTIAL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:
            \b(?:credential\s+id|certificate\s+id|certification\s+(?:number|no)
              | license\s+(?:number|no) | licence\s+(?:number|no) | id | no)\b\.?\s*[:\#]?
          | \#
        )\s*(?P<id>[a-z0-9][a-z0-9-]{3,})",
    )
    .expect("valid regex")
});

static ISSUED_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:issued\s+by|issuing\s+(?:organi[sz]ation|authority)|issuer|by)\s*:?\s+")
        .expect("valid regex")
});

/// Words that may trail an issuer name on an issuer-only line.
const ISSUER_FILLER: &[&str] = &[
    "cloud", "inc", "corp", "corporation", "learning", "training", "services", "web", "aws",
    "university", "academy", "institute", "certification", "online",
];

const BASE_CONFIDENCE: f64 = 0.5;
const MAX_ISSUER_WORDS: usize = 6;

/// What a single certification line contributes to its entry.
#[derive(Debug, Default)]
struct CertLine {
    name: Option<String>,
    issuer: Option<String>,
    date: Option<PartialDate>,
    credential_id: Option<String>,
}

impl CertLine {
    fn parse(text: &str) -> Self {
        let mut parsed = Self::default();
        let mut text = text.to_string();

        if let Some(caps) = CREDENTIAL_ID.captures(&text) {
            let id = &caps["id"];
            if id.chars().any(|c| c.is_ascii_digit()) {
                parsed.credential_id = Some(id.to_string());
                let span = caps.get(0).map_or(0..0, |m| m.range());
                text = without_span(&text, span);
            }
        }
        if let Some(found) = find_date_range(&text) {
            parsed.date = Some(found.range.start);
            text = without_span(&text, found.span);
        }

        let text = trim_separators(&text);
        if text.is_empty() {
            return parsed;
        }
        if let Some(label) = ISSUED_BY.find(text) {
            parsed.issuer = non_empty(&text[label.end()..]);
            return parsed;
        }
        if is_issuer(text) {
            parsed.issuer = non_empty(text);
            return parsed;
        }

        // "Name, Issuer" or "Name | Issuer" with the issuer in a later piece.
        let issuer_piece = segments(text)
            .into_iter()
            .skip(1)
            .rev()
            .find(|(_, piece)| is_issuer(piece));
        match issuer_piece {
            Some((range, piece)) => {
                parsed.name = non_empty(&text[..range.start]);
                parsed.issuer = non_empty(piece);
            }
            None => parsed.name = non_empty(text),
        }
        parsed
    }

    fn is_name(line: &Line) -> bool {
        Self::parse(line.content()).name.is_some()
    }
}

/// Certifications with issuer, date and credential ID.
pub struct CertificationsExtractor;

impl CertificationsExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn entry(group: &[Line]) -> Option<(CertificationEntry, f64)> {
        let mut entry = CertificationEntry::default();
        let mut explicit_issuer = false;

        for line in group {
            let parsed = CertLine::parse(line.content());
            if entry.name.is_empty() {
                if let Some(name) = parsed.name {
                    entry.name = name;
                }
            }
            if entry.issuer.is_none() && parsed.issuer.is_some() {
                entry.issuer = parsed.issuer;
                explicit_issuer = true;
            }
            entry.date = entry.date.or(parsed.date);
            entry.credential_id = entry.credential_id.or(parsed.credential_id);
        }

        if entry.name.is_empty() {
            return None;
        }
        if entry.issuer.is_none() {
            entry.issuer = ISSUER.find(&entry.name).map(|m| m.as_str().to_string());
        }

        let mut confidence = BASE_CONFIDENCE;
        if explicit_issuer {
            confidence += 0.2;
        } else if entry.issuer.is_some() {
            confidence += 0.1;
        }
        if entry.date.is_some() {
            confidence += 0.15;
        }
        if entry.credential_id.is_some() {
            confidence += 0.15;
        }
        Some((entry, confidence))
    }
}

impl Default for CertificationsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CertificationsExtractor {
    fn name(&self) -> &'static str {
        "certifications"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Section(SectionKind::Certifications)
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        // Every bullet opens an entry, as does a second name line.
        let groups = group_entries(lines, |group, rest| {
            let line = &rest[0];
            line.is_bullet() || (CertLine::is_name(line) && group.iter().any(CertLine::is_name))
        });

        groups
            .into_iter()
            .filter_map(|group| {
                let (entry, confidence) = Self::entry(group)?;
                Some(ExtractedField::new(
                    FieldValue::Certification(entry),
                    confidence,
                    group.iter().map(|l| l.index),
                ))
            })
            .collect()
    }
}

/// True for text naming only an issuing organisation.
fn is_issuer(text: &str) -> bool {
    if CERT_KEYWORD.is_match(text) || text.split_whitespace().count() > MAX_ISSUER_WORDS {
        return false;
    }
    if ORGANIZATION.is_match(text) {
        return true;
    }
    let Some(found) = ISSUER.find(text) else {
        return false;
    };
    let rest = format!("{} {}", &text[..found.start()], &text[found.end()..]);
    rest.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .all(|w| ISSUER_FILLER.contains(&w.as_str()))
}

fn non_empty(text: &str) -> Option<String> {
    let text = trim_separators(text);
    (!text.is_empty()).then(|| text.to_string())
}
