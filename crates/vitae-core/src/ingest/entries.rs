use std::sync::LazyLock;

use regex::Regex;

use super::dates::find_date_range;
use super::normalizer::Line;

/// "New York, NY", "Berlin, Germany", "Remote".
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^(?:
            (?i:remote|hybrid|on-?site)
          | [A-Z][A-Za-z.'\ -]{1,30},\s*(?:[A-Z]{2}|[A-Z][a-z]+)(?:,\s*[A-Z][A-Za-z]+)?
              (?:\s*\((?i:remote|hybrid)\))?
        )$",
    )
    .expect("valid regex")
});

static LEGAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),\s*(?:inc|llc|llp|ltd|corp|co|gmbh|plc|ag|sa)\.?$").expect("valid regex")
});

/// Non-location lines a following entry may use before its date.
const ENTRY_HEADER_LINES: usize = 3;

static SEGMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*|\s+[–—-]\s+|,\s+").expect("valid regex"));

/// Splits section lines into entries. A new entry starts at a plain line
/// after a blank line, at the first plain line following a run of bullets
/// unless it is a `Label: value` line,
/// and wherever `anchor` says the first of the remaining lines opens a new
/// entry given the lines gathered so far. Bullets after a blank line stay
/// with their entry.
pub(crate) fn group_entries<'a>(
    lines: &'a [Line],
    anchor: impl Fn(&[Line], &[Line]) -> bool,
) -> Vec<&'a [Line]> {
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..lines.len() {
        let (prev, line) = (&lines[i - 1], &lines[i]);
        let blank_gap = line.index > prev.index + 1 && !line.is_bullet();
        let after_bullets = prev.is_bullet() && !line.is_bullet() && !is_label_line(line);

        if blank_gap || after_bullets || anchor(&lines[start..i], &lines[i..]) {
            groups.push(&lines[start..i]);
            start = i;
        }
    }
    if start < lines.len() {
        groups.push(&lines[start..]);
    }
    groups
}

/// In a dated entry, a short plain line opens the next entry only when a
/// date follows within the next few header lines. Undated prose stays with
/// the entry as description.
pub(crate) fn starts_dated_entry(group: &[Line], rest: &[Line]) -> bool {
    let Some(line) = rest.first() else {
        return false;
    };
    let dated = |l: &Line| find_date_range(l.content()).is_some();
    !line.is_bullet()
        && group.len() > 1
        && line.text.split_whitespace().count() <= 8
        && !dated(line)
        && !is_location(line.content())
        && group.iter().any(dated)
        && rest
            .iter()
            .take_while(|l| !l.is_bullet())
            .filter(|l| !is_location(l.content()))
            .take(ENTRY_HEADER_LINES)
            .any(dated)
}

/// "Tools: Git, Jira" style lines continue the entry above them.
fn is_label_line(line: &Line) -> bool {
    line.text
        .split_once(':')
        .is_some_and(|(label, rest)| !rest.trim().is_empty() && label.split_whitespace().count() <= 2)
}

/// A line that only names a place.
pub(crate) fn is_location(text: &str) -> bool {
    LOCATION.is_match(text.trim()) && !LEGAL_SUFFIX.is_match(text.trim())
}

/// Joins bullet and prose lines into one description.
pub(crate) fn join_description<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Option<String> {
    let text = lines
        .into_iter()
        .map(Line::content)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Text with the given byte span cut out and dangling separators trimmed.
pub(crate) fn without_span(text: &str, span: std::ops::Range<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..span.start]);
    out.push(' ');
    out.push_str(&text[span.end..]);
    trim_separators(&out).to_string()
}

/// Splits a line on pipes, spaced dashes and commas, keeping each piece's
/// byte range in `text`.
pub(crate) fn segments(text: &str) -> Vec<(std::ops::Range<usize>, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for sep in SEGMENT_SEPARATOR.find_iter(text) {
        out.push((start..sep.start(), &text[start..sep.start()]));
        start = sep.end();
    }
    out.push((start..text.len(), &text[start..]));
    out.into_iter()
        .map(|(range, piece)| (range, trim_separators(piece)))
        .filter(|(_, piece)| !piece.is_empty())
        .collect()
}

pub(crate) fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '|' | '-' | '–' | '—' | '(' | ')' | ':' | ';' | '/')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[(usize, &str)]) -> Vec<Line> {
        items.iter().map(|(i, t)| Line::new(*i, *t)).collect()
    }

    #[test]
    fn test_blank_line_and_bullet_boundaries() {
        let input = lines(&[
            (0, "Senior Engineer"),
            (1, "ABC Tech"),
            (2, "• Shipped"),
            (3, "Engineer"),
            (4, "XYZ Corp"),
            (6, "Intern"),
        ]);
        let groups = group_entries(&input, |_, _| false);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1][0].text, "Engineer");
        assert_eq!(groups[2][0].text, "Intern");
    }

    #[test]
    fn test_label_line_after_bullets_continues_entry() {
        let input = lines(&[
            (0, "Engineer"),
            (1, "Acme"),
            (2, "• Built APIs"),
            (3, "Tools: Git, Jira"),
            (4, "Analyst"),
        ]);
        let groups = group_entries(&input, |_, _| false);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(groups[1][0].text, "Analyst");
    }

    #[test]
    fn test_dated_line_anchor() {
        let input = lines(&[
            (0, "Engineer"),
            (1, "ABC Tech"),
            (2, "2019 - 2021"),
            (3, "Analyst"),
            (4, "XYZ Corp"),
            (5, "2017 - 2019"),
        ]);
        let groups = group_entries(&input, starts_dated_entry);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1][0].text, "Analyst");
    }

    #[test]
    fn test_prose_after_dated_line_stays_in_entry() {
        let input = lines(&[
            (0, "Senior Engineer"),
            (1, "Acme Corp"),
            (2, "2020 - Present"),
            (3, "Built the billing system"),
            (4, "Led the migration to Rust"),
            (5, "Engineer"),
            (6, "Initech"),
            (7, "Austin, TX"),
            (8, "2018 - 2020"),
        ]);
        let groups = group_entries(&input, starts_dated_entry);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 5);
        assert_eq!(groups[1][0].text, "Engineer");
    }

    #[test]
    fn test_location_lines() {
        assert!(is_location("New York, NY"));
        assert!(is_location("Berlin, Germany"));
        assert!(is_location("Remote"));
        assert!(!is_location("Globex, Inc."));
        assert!(!is_location("ABC Tech, New York, NY"));
        assert!(!is_location("Jan 2019 - Dec 2020"));
    }

    #[test]
    fn test_without_span() {
        let text = "ABC Tech | Jun 2020 - Present";
        assert_eq!(without_span(text, 11..text.len()), "ABC Tech");
        assert_eq!(join_description(&lines(&[(0, "• a"), (1, "b")])), Some("a b".into()));
    }
}
