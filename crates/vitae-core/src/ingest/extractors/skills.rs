use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionKind;

const MAX_SKILL_CHARS: usize = 40;
const MAX_SKILL_WORDS: usize = 5;
const MAX_LABEL_WORDS: usize = 4;
const CONFIDENCE: f64 = 0.75;
const VOCABULARY_CONFIDENCE: f64 = 0.6;

/// Skills recognised inside prose. Words that are mostly ordinary English
/// ("go", "rest", "word", "teams") are left out.
const KNOWN_SKILLS: &[&str] = &[
    // languages
    "python", "java", "javascript", "typescript", "c++", "c#", "golang", "ruby", "php", "perl",
    "swift", "kotlin", "scala", "rust", "dart", "objective-c", "matlab", "bash", "powershell",
    "sql", "haskell", "elixir", "julia",
    // web and mobile
    "html", "css", "sass", "react", "react native", "angular", "vue", "svelte", "next.js",
    "node.js", "django", "flask", "spring boot", "graphql", "rest api", "webpack", "redux",
    "jquery", "tailwind", "flutter", "android", "ios",
    // data stores
    "mysql", "postgresql", "postgres", "sqlite", "mongodb", "redis", "cassandra", "dynamodb",
    "elasticsearch",
    // infrastructure
    "aws", "amazon web services", "azure", "gcp", "google cloud", "docker", "kubernetes",
    "terraform", "ansible", "jenkins", "ci/cd", "git", "github", "gitlab", "linux", "nginx",
    "microservices", "kafka", "spark", "hadoop", "airflow",
    // data and ml
    "machine learning", "deep learning", "natural language processing", "nlp",
    "computer vision", "tensorflow", "pytorch", "keras", "scikit-learn", "pandas", "numpy",
    "tableau", "power bi", "data analysis", "data visualization",
    // soft skills
    "communication", "teamwork", "problem solving", "critical thinking", "leadership",
    "time management", "project management", "public speaking", "collaboration", "mentoring",
    "negotiation",
    // tools
    "excel", "powerpoint", "photoshop", "illustrator", "figma", "jira", "confluence", "trello",
    "salesforce", "autocad", "solidworks", "blender",
];

static SKILL_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    let mut terms: Vec<&str> = KNOWN_SKILLS.to_vec();
    // Longest first so "react native" wins over "react".
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternatives: Vec<String> = terms
        .iter()
        .map(|term| {
            let body = regex::escape(term).replace(' ', r"[\s-]+");
            let start = if term.starts_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            let end = if term.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            format!("{start}{body}{end}")
        })
        .collect();
    Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))).expect("valid regex")
});

/// Splits skills lists on common delimiters, dropping category labels such
/// as "Languages:". Tokens too long to be a skill are searched for known
/// skills instead.
pub struct SkillsExtractor;

impl SkillsExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SkillsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for SkillsExtractor {
    fn name(&self) -> &'static str {
        "skills"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Section(SectionKind::Skills)
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();

        for line in lines {
            for token in split_outside_parens(strip_label(line.content())) {
                let found: Vec<(&str, f64)> = match clean_token(token) {
                    Some(skill) => vec![(skill, CONFIDENCE)],
                    None => SKILL_VOCABULARY
                        .find_iter(token)
                        .map(|m| (m.as_str(), VOCABULARY_CONFIDENCE))
                        .collect(),
                };
                for (skill, confidence) in found {
                    if seen.insert(skill.to_lowercase()) {
                        fields.push(ExtractedField::new(
                            FieldValue::Skill(skill.to_string()),
                            confidence,
                            [line.index],
                        ));
                    }
                }
            }
        }
        fields
    }
}

fn strip_label(text: &str) -> &str {
    match text.split_once(':') {
        Some((label, rest))
            if !rest.trim().is_empty()
                && label.split_whitespace().count() <= MAX_LABEL_WORDS =>
        {
            rest
        }
        _ => text,
    }
}

pub(crate) fn split_outside_parens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' | '|' | ';' | '•' | '·' if depth == 0 => {
                out.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

pub(crate) fn clean_token(token: &str) -> Option<&str> {
    let token = token.trim();
    let token = token.strip_prefix("and ").unwrap_or(token);
    let token = token.trim_end_matches(['.', ':', ';', ',']).trim();

    let valid = token.chars().any(char::is_alphanumeric)
        && token.chars().count() <= MAX_SKILL_CHARS
        && token.split_whitespace().count() <= MAX_SKILL_WORDS
        && !token.eq_ignore_ascii_case("etc");
    valid.then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalizer::normalize;

    fn skills(text: &str) -> Vec<String> {
        let document = normalize(text);
        SkillsExtractor::new()
            .extract(document.lines(), &document)
            .into_iter()
            .filter_map(|f| match f.value {
                FieldValue::Skill(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_case_insensitive_dedup_keeps_first_casing() {
        assert_eq!(skills("Python, python, SQL"), vec!["Python", "SQL"]);
        assert_eq!(skills("Python\npython\nSQL"), vec!["Python", "SQL"]);
    }

    #[test]
    fn test_labels_and_delimiters() {
        assert_eq!(
            skills("• Programming: Python, R, SQL | Rust; Go\nTools: Git · Docker"),
            vec!["Python", "R", "SQL", "Rust", "Go", "Git", "Docker"]
        );
    }

    #[test]
    fn test_parentheses_protect_commas() {
        assert_eq!(
            skills("Cloud: AWS (EC2, S3, Lambda), GCP"),
            vec!["AWS (EC2, S3, Lambda)", "GCP"]
        );
    }

    #[test]
    fn test_noise_tokens_dropped() {
        assert_eq!(
            skills("Python, --, etc.\nAble to lead cross functional teams through ambiguity"),
            vec!["Python"]
        );
    }

    #[test]
    fn test_known_skills_found_in_prose() {
        assert_eq!(
            skills(
                "Python, Rust\nExperienced with python and machine learning, plus strong communication and problem-solving abilities"
            ),
            vec!["Python", "Rust", "machine learning", "communication", "problem-solving"]
        );
    }

    #[test]
    fn test_vocabulary_matches_symbols_and_longest_phrase() {
        assert_eq!(
            skills("Built mobile apps in React Native and services in C++ and Node.js"),
            vec!["React Native", "C++", "Node.js"]
        );
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        assert_eq!(skills("Docker, Kubernetes, and Terraform."), vec!["Docker", "Kubernetes", "Terraform"]);
    }
}
