use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::ingest::extractor::{ExtractedField, ExtractorScope, FieldExtractor, FieldValue};
use crate::ingest::normalizer::{Line, NormalizedText};
use crate::ingest::segmenter::SectionVocabulary;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:\+?\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}
      | \d{5}[\s.-]?\d{6}
      | \+\d{1,3}(?:[\s.-]?\d{2,4}){2,5}",
    )
    .expect("valid regex")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        https?://[^\s,;|<>()]+
      | www\.[^\s,;|<>()]+
      | (?:[a-z0-9-]+\.)*
        (?:linkedin\.com|github\.com|gitlab\.com|bitbucket\.org|stackoverflow\.com
          |behance\.net|dribbble\.com|medium\.com|twitter\.com)
        (?:/[^\s,;|<>()]*)?
      | (?:[a-z0-9-]+\.)+[a-z]{2,6}/[^\s,;|<>()]+",
    )
    .expect("valid regex")
});

/// Hosts of professional networks, scored above arbitrary domains.
const KNOWN_NETWORKS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "stackoverflow.com",
    "behance.net",
    "dribbble.com",
    "medium.com",
    "twitter.com",
];

const PHONE_LABELS: &[&str] = &["phone", "tel", "mobile", "cell", "contact", "ph:", "ph."];

/// Name candidates are only looked for near the top of the document.
const NAME_WINDOW: usize = 8;

/// Scans every line for emails, phones and profile URLs, and the top of the
/// document for the candidate's name.
pub struct ContactExtractor {
    vocabulary: SectionVocabulary,
}

impl ContactExtractor {
    #[must_use]
    pub const fn new(vocabulary: SectionVocabulary) -> Self {
        Self { vocabulary }
    }

    fn emails(line: &Line, seen: &mut HashSet<String>, out: &mut Vec<ExtractedField>) {
        for m in EMAIL.find_iter(&line.text) {
            let email = m.as_str().trim_end_matches('.');
            if seen.insert(email.to_lowercase()) {
                out.push(ExtractedField::new(
                    FieldValue::Email(email.to_string()),
                    0.95,
                    [line.index],
                ));
            }
        }
    }

    fn phones(line: &Line, text: &str, seen: &mut HashSet<String>, out: &mut Vec<ExtractedField>) {
        let lower = line.text.to_lowercase();
        let labelled = PHONE_LABELS.iter().any(|l| lower.contains(l));

        for m in PHONE.find_iter(text) {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            if before.is_some_and(|c| c.is_alphanumeric() || c == '/')
                || after.is_some_and(|c| c.is_ascii_digit() || c == '/')
            {
                continue;
            }
            let Some(phone) = normalize_phone(m.as_str()) else {
                continue;
            };
            let key: String = phone.chars().filter(char::is_ascii_digit).collect();
            if seen.insert(key) {
                let confidence = if labelled { 0.9 } else { 0.75 };
                out.push(ExtractedField::new(FieldValue::Phone(phone), confidence, [line.index]));
            }
        }
    }

    fn urls(line: &Line, text: &str, seen: &mut HashSet<String>, out: &mut Vec<ExtractedField>) {
        for m in URL.find_iter(text) {
            if text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '@')
            {
                continue;
            }
            let found = m.as_str().trim_end_matches(['.', ',', ')', ':', ';']);
            let Some((field, key)) = classify_url(found) else {
                continue;
            };
            if seen.insert(key) {
                out.push(ExtractedField {
                    source_lines: [line.index].into(),
                    ..field
                });
            }
        }
    }

    fn names(&self, lines: &[Line]) -> Vec<ExtractedField> {
        let candidates: Vec<&Line> = lines
            .iter()
            .take(NAME_WINDOW)
            .filter(|l| self.is_name_candidate(l))
            .collect();

        let base = if candidates.len() == 1 { 0.85 } else { 0.65 };
        candidates
            .iter()
            .enumerate()
            .map(|(rank, line)| {
                let confidence = 0.05f64.mul_add(-(rank as f64), base);
                ExtractedField::new(FieldValue::Name(line.text.clone()), confidence, [line.index])
            })
            .collect()
    }

    fn is_name_candidate(&self, line: &Line) -> bool {
        if line.is_bullet() {
            return false;
        }
        let text = line.text.as_str();
        let words: Vec<&str> = text.split_whitespace().collect();
        if !(2..=4).contains(&words.len()) || text.chars().count() > 40 {
            return false;
        }
        if !text
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '-' || c == '\'')
        {
            return false;
        }
        if !words
            .iter()
            .all(|w| w.chars().next().is_some_and(char::is_uppercase))
        {
            return false;
        }
        self.vocabulary.classify(text).is_none() && self.vocabulary.exact(text).is_none()
    }
}

impl FieldExtractor for ContactExtractor {
    fn name(&self) -> &'static str {
        "contact"
    }

    fn scope(&self) -> ExtractorScope {
        ExtractorScope::Document
    }

    fn extract(&self, lines: &[Line], _document: &NormalizedText) -> Vec<ExtractedField> {
        let mut fields = Vec::new();
        let (mut emails, mut phones, mut urls) = (HashSet::new(), HashSet::new(), HashSet::new());

        for line in lines {
            Self::emails(line, &mut emails, &mut fields);
            // Email domains must not be re-read as websites or phones.
            let text = EMAIL.replace_all(&line.text, " ");
            Self::phones(line, &text, &mut phones, &mut fields);
            Self::urls(line, &text, &mut urls, &mut fields);
        }

        fields.extend(self.names(lines));
        fields
    }
}

/// Digit groups joined by `-`, keeping a leading `+`. Bare 10 and 11 digit
/// runs are regrouped the North American way.
fn normalize_phone(raw: &str) -> Option<String> {
    let groups: Vec<&str> = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect();
    let digits: String = groups.concat();
    if !(10..=15).contains(&digits.len()) {
        return None;
    }

    let plus = if raw.trim_start().starts_with('+') { "+" } else { "" };
    let joined = match (groups.len(), digits.len()) {
        (1, 10) => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        (1, 11) => format!(
            "{}-{}-{}-{}",
            &digits[..1],
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
        _ => groups.join("-"),
    };
    Some(format!("{plus}{joined}"))
}

/// Field for a URL-looking string plus its dedup key, or `None` if it does
/// not parse as a web address.
fn classify_url(found: &str) -> Option<(ExtractedField, String)> {
    let with_scheme = if found.contains("://") {
        found.to_string()
    } else {
        format!("https://{found}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !host.contains('.') {
        return None;
    }

    let key = format!("{host}{}", url.path().trim_end_matches('/')).to_lowercase();
    let is_host = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    let (value, confidence) = if is_host("linkedin.com") {
        let confidence = if url.path().starts_with("/in/") { 0.95 } else { 0.8 };
        (FieldValue::LinkedIn(found.to_string()), confidence)
    } else if KNOWN_NETWORKS.iter().any(|d| is_host(d)) {
        (FieldValue::Website(found.to_string()), 0.85)
    } else {
        (FieldValue::Website(found.to_string()), 0.7)
    };
    Some((ExtractedField::new(value, confidence, []), key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalizer::normalize;

    fn extract(text: &str) -> Vec<ExtractedField> {
        let document = normalize(text);
        ContactExtractor::new(SectionVocabulary::default()).extract(document.lines(), &document)
    }

    fn values(fields: &[ExtractedField], pick: fn(&FieldValue) -> Option<&String>) -> Vec<String> {
        fields.iter().filter_map(|f| pick(&f.value)).cloned().collect()
    }

    fn emails(fields: &[ExtractedField]) -> Vec<String> {
        values(fields, |v| match v {
            FieldValue::Email(e) => Some(e),
            _ => None,
        })
    }

    fn phones(fields: &[ExtractedField]) -> Vec<String> {
        values(fields, |v| match v {
            FieldValue::Phone(p) => Some(p),
            _ => None,
        })
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 123-4567").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("555.123.4567").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("5551234567").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("15551234567").as_deref(), Some("1-555-123-4567"));
        assert_eq!(
            normalize_phone("+44 20 7946 0958").as_deref(),
            Some("+44-20-7946-0958")
        );
        assert_eq!(normalize_phone("2016 - 2020"), None);
    }

    #[test]
    fn test_email_and_phone() {
        let fields = extract("Email: john.doe@example.com\nPhone: (555) 123-4567");

        assert_eq!(emails(&fields), vec!["john.doe@example.com"]);
        assert_eq!(phones(&fields), vec!["555-123-4567"]);
        let phone = fields
            .iter()
            .find(|f| matches!(f.value, FieldValue::Phone(_)))
            .unwrap();
        assert!((phone.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_emails_deduplicated_case_insensitively() {
        let fields = extract("JDoe@Example.com\njdoe@example.com\nother@example.org");
        assert_eq!(emails(&fields), vec!["JDoe@Example.com", "other@example.org"]);
    }

    #[test]
    fn test_dates_are_not_phones() {
        let fields = extract("2016 - 2020\n01/2019 - 03/2021\nID 12345678901234567");
        assert!(phones(&fields).is_empty());
    }

    #[test]
    fn test_urls_classified() {
        let fields = extract(
            "linkedin.com/in/johndoe | github.com/johndoe\nhttps://johndoe.dev\njohn@johndoe.dev",
        );

        let linkedin: Vec<_> = fields
            .iter()
            .filter_map(|f| match &f.value {
                FieldValue::LinkedIn(u) => Some((u.as_str(), f.confidence)),
                _ => None,
            })
            .collect();
        assert_eq!(linkedin.len(), 1);
        assert_eq!(linkedin[0].0, "linkedin.com/in/johndoe");
        assert!((linkedin[0].1 - 0.95).abs() < f64::EPSILON);

        let websites = values(&fields, |v| match v {
            FieldValue::Website(w) => Some(w),
            _ => None,
        });
        assert_eq!(websites, vec!["github.com/johndoe", "https://johndoe.dev"]);
    }

    #[test]
    fn test_skill_names_are_not_websites() {
        let fields = extract("SKILLS\nASP.NET, Node.js, Vue.js");
        assert!(fields
            .iter()
            .all(|f| !matches!(f.value, FieldValue::Website(_))));
    }

    #[test]
    fn test_single_name_candidate() {
        let fields = extract("John Doe\njohn@example.com\nEXPERIENCE\nSoftware Engineer");
        let names: Vec<_> = fields
            .iter()
            .filter(|f| matches!(f.value, FieldValue::Name(_)))
            .collect();

        // "EXPERIENCE" is a header, "Software Engineer" is a second candidate.
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].value, FieldValue::Name("John Doe".into()));
        assert!(names[0].confidence > names[1].confidence);
        assert!(names[0].confidence < 0.85);
    }

    #[test]
    fn test_unique_name_scores_high() {
        let fields = extract("Jane Roe\njane@example.com | 555-123-4567");
        let name = fields
            .iter()
            .find(|f| matches!(f.value, FieldValue::Name(_)))
            .unwrap();
        assert!((name.confidence - 0.85).abs() < f64::EPSILON);
    }
}
