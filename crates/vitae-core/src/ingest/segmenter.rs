use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normalizer::{Line, NormalizedText, BULLET_MARKER};
use crate::config::ParserConfig;

/// Section labels. Declaration order is the tie-break priority when a header
/// matches keywords of equal length from several kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Contact,
    Education,
    Experience,
    Skills,
    Projects,
    Certifications,
    Summary,
    Unclassified,
}

impl SectionKind {
    pub const ALL: [Self; 8] = [
        Self::Contact,
        Self::Education,
        Self::Experience,
        Self::Skills,
        Self::Projects,
        Self::Certifications,
        Self::Summary,
        Self::Unclassified,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Education => "education",
            Self::Experience => "experience",
            Self::Skills => "skills",
            Self::Projects => "projects",
            Self::Certifications => "certifications",
            Self::Summary => "summary",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for SectionKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidSectionKind(s.to_string()))
    }
}

const DEFAULT_VOCABULARY: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::Contact,
        &[
            "contact",
            "contact information",
            "contact info",
            "contact details",
            "personal information",
            "personal details",
        ],
    ),
    (
        SectionKind::Education,
        &[
            "education",
            "academic background",
            "academic qualifications",
            "educational background",
            "educational qualifications",
            "academics",
            "qualifications",
            "education and training",
        ],
    ),
    (
        SectionKind::Experience,
        &[
            "experience",
            "work experience",
            "professional experience",
            "employment",
            "employment history",
            "work history",
            "career history",
            "internship",
            "internships",
            "relevant experience",
        ],
    ),
    (
        SectionKind::Skills,
        &[
            "skills",
            "technical skills",
            "skills and abilities",
            "core competencies",
            "competencies",
            "areas of expertise",
            "expertise",
            "technologies",
            "programming languages",
            "tools",
            "tools and technologies",
        ],
    ),
    (
        SectionKind::Projects,
        &[
            "projects",
            "personal projects",
            "academic projects",
            "key projects",
            "project experience",
            "side projects",
        ],
    ),
    (
        SectionKind::Certifications,
        &[
            "certifications",
            "certification",
            "certificates",
            "licenses",
            "licenses and certifications",
            "certifications and licenses",
            "professional certifications",
            "credentials",
        ],
    ),
    (
        SectionKind::Summary,
        &[
            "summary",
            "professional summary",
            "career summary",
            "profile",
            "professional profile",
            "objective",
            "career objective",
            "about me",
            "overview",
        ],
    ),
    (
        SectionKind::Unclassified,
        &[
            "awards",
            "honors",
            "honors and awards",
            "achievements",
            "publications",
            "languages",
            "interests",
            "hobbies",
            "references",
            "volunteer experience",
            "volunteering",
            "activities",
            "extracurricular activities",
        ],
    ),
];

/// Words ignored when judging whether a header is "mostly keyword".
const FILLER_WORDS: &[&str] = &[
    "and", "of", "the", "in", "for", "to", "a", "my", "relevant", "professional", "technical",
    "key", "core", "additional", "selected", "other", "recent", "related",
];

const TITLE_CASE_EXEMPT: &[&str] = &["and", "of", "&", "the", "in", "for", "to", "a", "an", "at"];

const HEADER_DECORATION: &[char] = &[':', '-', '_', '=', '*', '#', '•', '|'];

const MAX_HEADER_WORDS: usize = 6;
const MAX_HEADER_CHARS: usize = 50;

/// Trigger phrases per section kind, stored normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionVocabulary {
    phrases: BTreeMap<SectionKind, Vec<String>>,
}

impl Default for SectionVocabulary {
    fn default() -> Self {
        let phrases = DEFAULT_VOCABULARY
            .iter()
            .map(|(kind, phrases)| (*kind, phrases.iter().map(|p| normalize_phrase(p)).collect()))
            .collect();
        Self { phrases }
    }
}

impl SectionVocabulary {
    /// Each kind present in `overrides` has its default phrases replaced.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<SectionKind, BTreeSet<String>>) -> Self {
        for (kind, phrases) in overrides {
            let normalized: Vec<String> = phrases
                .iter()
                .map(|p| normalize_phrase(p))
                .filter(|p| !p.is_empty())
                .collect();
            self.phrases.insert(*kind, normalized);
        }
        self
    }

    /// Kind whose trigger phrase equals `text` exactly after normalization.
    pub fn exact(&self, text: &str) -> Option<SectionKind> {
        let text = normalize_phrase(text);
        self.phrases
            .iter()
            .find(|(_, phrases)| phrases.contains(&text))
            .map(|(kind, _)| *kind)
    }

    /// Kind for a header-shaped text. The longest matching phrase wins and
    /// keywords must cover most of the meaningful words.
    pub fn classify(&self, text: &str) -> Option<SectionKind> {
        let words = header_words(text);
        let mut covered = vec![false; words.len()];
        let mut best: Option<(usize, SectionKind)> = None;

        for (kind, phrases) in &self.phrases {
            for phrase in phrases {
                let needle: Vec<&str> = phrase.split(' ').collect();
                if needle.len() > words.len() {
                    continue;
                }
                for start in 0..=words.len() - needle.len() {
                    if words[start..start + needle.len()] != needle[..] {
                        continue;
                    }
                    covered[start..start + needle.len()].fill(true);
                    if best.is_none_or(|(len, _)| phrase.len() > len) {
                        best = Some((phrase.len(), *kind));
                    }
                }
            }
        }

        let (_, kind) = best?;
        let total = words
            .iter()
            .filter(|w| !FILLER_WORDS.contains(&w.as_str()))
            .count();
        let uncovered = words
            .iter()
            .zip(&covered)
            .filter(|(w, c)| !**c && !FILLER_WORDS.contains(&w.as_str()))
            .count();

        (uncovered * 2 < total).then_some(kind)
    }
}

fn normalize_phrase(text: &str) -> String {
    header_words(text).join(" ")
}

fn header_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('&', " and ")
        .split(|c: char| c.is_whitespace() || c == '/' || c == ',')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// A contiguous block of lines under one label. `start_line` and `end_line`
/// are positions in the normalized text, header line included; `lines` holds
/// the body only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub lines: Vec<Line>,
}

impl Section {
    fn headerless(kind: SectionKind, start_line: usize, lines: &[Line]) -> Self {
        Self {
            kind,
            start_line,
            end_line: start_line + lines.len() - 1,
            header: None,
            lines: lines.to_vec(),
        }
    }
}

struct HeaderMatch {
    kind: SectionKind,
    header: String,
    rest: Option<String>,
}

struct OpenSection {
    kind: SectionKind,
    start_line: usize,
    header: String,
    lines: Vec<Line>,
}

impl OpenSection {
    fn close(self, end_line: usize) -> Section {
        Section {
            kind: self.kind,
            start_line: self.start_line,
            end_line,
            header: Some(self.header),
            lines: self.lines,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    vocabulary: SectionVocabulary,
}

impl Segmenter {
    pub const fn new(vocabulary: SectionVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(SectionVocabulary::default().with_overrides(&config.section_keyword_overrides))
    }

    pub const fn vocabulary(&self) -> &SectionVocabulary {
        &self.vocabulary
    }

    /// Kind of a standalone header line, if `text` is one.
    pub fn header_kind(&self, text: &str) -> Option<SectionKind> {
        let candidate = header_candidate(text)?;
        self.vocabulary.classify(candidate)
    }

    pub fn segment(&self, text: &NormalizedText) -> Vec<Section> {
        let lines = text.lines();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut sections = Vec::new();
        let mut open: Option<OpenSection> = None;

        for (pos, line) in lines.iter().enumerate() {
            let inline = open.as_ref().is_none_or(|s| {
                matches!(
                    s.kind,
                    SectionKind::Contact | SectionKind::Summary | SectionKind::Unclassified
                )
            });
            let Some(found) = self.match_header(line, inline) else {
                if let Some(section) = open.as_mut() {
                    section.lines.push(line.clone());
                }
                continue;
            };

            match open.take() {
                Some(section) => sections.push(section.close(pos - 1)),
                None if pos > 0 => sections.extend(preamble(&lines[..pos])),
                None => {}
            }

            let mut body = Vec::new();
            if let Some(rest) = found.rest {
                body.push(Line::new(line.index, rest));
            }
            open = Some(OpenSection {
                kind: found.kind,
                start_line: pos,
                header: found.header,
                lines: body,
            });
        }

        match open {
            Some(section) => sections.push(section.close(lines.len() - 1)),
            None => {
                let kind = if lines.iter().any(|l| is_prose(l.content())) {
                    SectionKind::Summary
                } else {
                    SectionKind::Unclassified
                };
                sections.push(Section::headerless(kind, 0, lines));
            }
        }

        split_certifications(&mut sections, lines);

        debug!(
            lines = lines.len(),
            sections = sections.len(),
            "segmented document"
        );
        sections
    }

    fn match_header(&self, line: &Line, inline: bool) -> Option<HeaderMatch> {
        if let Some(kind) = self.header_kind(&line.text) {
            return Some(HeaderMatch {
                kind,
                header: line.text.clone(),
                rest: None,
            });
        }

        // Entry-bearing sections hold "Tools: ..." style label lines as data.
        if !inline || line.is_bullet() {
            return None;
        }
        let (prefix, rest) = line.text.split_once(':')?;
        let rest = rest.trim();
        if rest.is_empty() || prefix.split_whitespace().count() > MAX_HEADER_WORDS {
            return None;
        }
        let kind = self.vocabulary.exact(prefix)?;
        Some(HeaderMatch {
            kind,
            header: prefix.trim().to_string(),
            rest: Some(rest.to_string()),
        })
    }
}

/// Header text with decoration stripped, if the line is shaped like a header.
fn header_candidate(text: &str) -> Option<&str> {
    if text.starts_with(BULLET_MARKER) {
        return None;
    }
    let stripped = text.trim_matches(|c: char| c.is_whitespace() || HEADER_DECORATION.contains(&c));
    // An inner colon makes it a "Label: value" line.
    if stripped.is_empty()
        || stripped.contains(':')
        || stripped.chars().count() > MAX_HEADER_CHARS
        || stripped.split_whitespace().count() > MAX_HEADER_WORDS
        || stripped.ends_with(['.', ',', ';', '!', '?'])
    {
        return None;
    }
    (is_all_caps(stripped) || is_title_case(stripped)).then_some(stripped)
}

fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

fn is_title_case(text: &str) -> bool {
    text.split_whitespace().all(|word| {
        if TITLE_CASE_EXEMPT.contains(&word.to_lowercase().as_str()) {
            return true;
        }
        word.chars()
            .find(|c| c.is_alphabetic())
            .is_none_or(char::is_uppercase)
    })
}

/// Running prose, as opposed to the short fragments of a contact block.
fn is_prose(text: &str) -> bool {
    if text.contains('@') || text.contains("://") || text.contains('|') {
        return false;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let alphabetic = words
        .iter()
        .filter(|w| {
            let core = w.trim_matches(|c: char| !c.is_alphanumeric());
            !core.is_empty() && core.chars().all(char::is_alphabetic)
        })
        .count();
    if alphabetic * 4 < words.len() * 3 {
        return false;
    }
    words.len() >= 8 || (words.len() >= 5 && text.ends_with(['.', '!', '?']))
}

/// Lines above the first header: the contact block, then any summary prose.
fn preamble(lines: &[Line]) -> Vec<Section> {
    match lines.iter().position(|l| is_prose(l.content())) {
        Some(0) => vec![Section::headerless(SectionKind::Summary, 0, lines)],
        Some(p) => vec![
            Section::headerless(SectionKind::Contact, 0, &lines[..p]),
            Section::headerless(SectionKind::Summary, p, &lines[p..]),
        ],
        None => vec![Section::headerless(SectionKind::Contact, 0, lines)],
    }
}

/// Certifications listed under Education without their own header move to
/// a header-less Certifications section.
fn split_certifications(sections: &mut Vec<Section>, all_lines: &[Line]) {
    if sections.iter().any(|s| s.kind == SectionKind::Certifications) {
        return;
    }

    let mut i = 0;
    while i < sections.len() {
        let section = &sections[i];
        let split_at = (section.kind == SectionKind::Education)
            .then(|| {
                section.lines.iter().skip(1).position(|l| {
                    let lower = l.content().to_lowercase();
                    ["certified", "certification", "certificate", "license", "licence"]
                        .iter()
                        .any(|p| lower.starts_with(p))
                })
            })
            .flatten()
            .map(|p| p + 1);

        if let Some(k) = split_at {
            let index = section.lines[k].index;
            if let Ok(pos) = all_lines.binary_search_by_key(&index, |l| l.index) {
                let education = &mut sections[i];
                let tail = education.lines.split_off(k);
                let end_line = education.end_line;
                education.end_line = pos - 1;
                sections.insert(
                    i + 1,
                    Section {
                        kind: SectionKind::Certifications,
                        start_line: pos,
                        end_line,
                        header: None,
                        lines: tail,
                    },
                );
                i += 1;
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalizer::normalize;

    fn kinds(sections: &[Section]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind).collect()
    }

    fn assert_coverage(text: &NormalizedText, sections: &[Section]) {
        if text.is_empty() {
            assert!(sections.is_empty());
            return;
        }
        assert_eq!(sections[0].start_line, 0);
        for pair in sections.windows(2) {
            assert!(pair[0].start_line <= pair[0].end_line);
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }
        let last = sections.last().unwrap();
        assert!(last.start_line <= last.end_line);
        assert_eq!(last.end_line, text.len() - 1);
    }

    const SAMPLE: &str = "John Doe
john.doe@example.com | (555) 123-4567

Results-driven software engineer with eight years of experience building web platforms.

EDUCATION
Bachelor of Science in Computer Science
New York University
2016 - 2020

Work Experience
Senior Software Engineer
ABC Tech, New York, NY
June 2020 - Present
• Led a team of five engineers

SKILLS
Programming Languages: Python, Java
Tools: Git, Docker

Languages
English, Spanish";

    #[test]
    fn test_section_kind_from_str() {
        assert_eq!("Skills".parse::<SectionKind>().unwrap(), SectionKind::Skills);
        assert_eq!(SectionKind::Certifications.to_string(), "certifications");
        assert!("hobbies".parse::<SectionKind>().is_err());
    }

    #[test]
    fn test_segments_sample() {
        let text = normalize(SAMPLE);
        let sections = Segmenter::default().segment(&text);

        assert_eq!(
            kinds(&sections),
            vec![
                SectionKind::Contact,
                SectionKind::Summary,
                SectionKind::Education,
                SectionKind::Experience,
                SectionKind::Skills,
                SectionKind::Unclassified,
            ]
        );
        assert_coverage(&text, &sections);

        let skills = &sections[4];
        assert_eq!(skills.header.as_deref(), Some("SKILLS"));
        assert_eq!(skills.lines.len(), 2);
        assert_eq!(sections[3].lines[0].text, "Senior Software Engineer");
    }

    #[test]
    fn test_longest_keyword_wins() {
        let vocab = SectionVocabulary::default();
        assert_eq!(vocab.classify("Volunteer Experience"), Some(SectionKind::Unclassified));
        assert_eq!(vocab.classify("Programming Languages"), Some(SectionKind::Skills));
        assert_eq!(vocab.classify("PROJECT EXPERIENCE"), Some(SectionKind::Projects));
        assert_eq!(vocab.classify("Relevant Work Experience"), Some(SectionKind::Experience));
    }

    #[test]
    fn test_equal_length_falls_back_to_priority() {
        let vocab = SectionVocabulary::default();
        // "skills" and "awards" are both six characters.
        assert_eq!(vocab.classify("Skills & Awards"), Some(SectionKind::Skills));
    }

    #[test]
    fn test_keyword_must_dominate_header() {
        let vocab = SectionVocabulary::default();
        assert_eq!(vocab.classify("Education Coordinator"), None);
        assert_eq!(vocab.classify("Machine Learning Projects"), None);
    }

    #[test]
    fn test_header_formatting_heuristic() {
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.header_kind("EXPERIENCE"), Some(SectionKind::Experience));
        assert_eq!(segmenter.header_kind("## Skills:"), Some(SectionKind::Skills));
        assert_eq!(segmenter.header_kind("Areas of Expertise"), Some(SectionKind::Skills));
        assert_eq!(segmenter.header_kind("experience"), None);
        assert_eq!(segmenter.header_kind("Experience."), None);
        assert_eq!(segmenter.header_kind("• Skills"), None);
        assert_eq!(segmenter.header_kind("Programming Languages: Python"), None);
    }

    #[test]
    fn test_inline_header() {
        let text = normalize("Jane Roe\nSummary: Backend engineer\nEDUCATION\nMIT");
        let sections = Segmenter::default().segment(&text);

        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Contact, SectionKind::Summary, SectionKind::Education]
        );
        assert_eq!(sections[1].lines[0].text, "Backend engineer");
        assert_coverage(&text, &sections);
    }

    #[test]
    fn test_label_lines_stay_inside_entry_sections() {
        let text = normalize(
            "EXPERIENCE\nSoftware Engineer\nAcme Corp\n2019 - 2021\n• Built APIs\nTools: Git, Jira\n\n\
             Data Analyst\nGlobex Corporation\n2017 - 2019\n• Reports\n\n\
             PROJECTS\nBilling Engine\nTechnologies: Rust, Postgres",
        );
        let sections = Segmenter::default().segment(&text);

        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Experience, SectionKind::Projects]
        );
        assert_eq!(sections[0].lines.len(), 9);
        assert_eq!(sections[0].lines[4].text, "Tools: Git, Jira");
        assert_eq!(sections[1].lines[1].text, "Technologies: Rust, Postgres");
        assert_coverage(&text, &sections);
    }

    #[test]
    fn test_no_headers_is_one_section() {
        let prose = normalize("Jane Roe\nI have spent ten years building distributed systems at scale.");
        let sections = Segmenter::default().segment(&prose);
        assert_eq!(kinds(&sections), vec![SectionKind::Summary]);
        assert_coverage(&prose, &sections);

        let fragments = normalize("Jane Roe\njane@example.com\n555-123-4567");
        let sections = Segmenter::default().segment(&fragments);
        assert_eq!(kinds(&sections), vec![SectionKind::Unclassified]);
        assert_coverage(&fragments, &sections);
    }

    #[test]
    fn test_empty_document_has_no_sections() {
        let sections = Segmenter::default().segment(&NormalizedText::default());
        assert!(sections.is_empty());
    }

    #[test]
    fn test_keyword_overrides_replace_defaults() {
        let mut config = ParserConfig::default();
        config.section_keyword_overrides.insert(
            SectionKind::Experience,
            BTreeSet::from(["Career Path".to_string()]),
        );
        let segmenter = Segmenter::from_config(&config);

        assert_eq!(segmenter.header_kind("CAREER PATH"), Some(SectionKind::Experience));
        assert_eq!(segmenter.header_kind("Work Experience"), None);
    }

    #[test]
    fn test_certifications_split_from_education() {
        let text = normalize(
            "EDUCATION\nB.S. Computer Science\nState University\nCertified Kubernetes Administrator\nCNCF",
        );
        let sections = Segmenter::default().segment(&text);

        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Education, SectionKind::Certifications]
        );
        assert_eq!(sections[0].lines.len(), 2);
        assert_eq!(sections[1].lines[0].text, "Certified Kubernetes Administrator");
        assert_coverage(&text, &sections);
    }

    #[test]
    fn test_coverage_with_adjacent_headers() {
        let text = normalize("EXPERIENCE\nSKILLS\nRust\nPROJECTS");
        let sections = Segmenter::default().segment(&text);

        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Experience, SectionKind::Skills, SectionKind::Projects]
        );
        assert!(sections[0].lines.is_empty());
        assert_coverage(&text, &sections);
    }
}
