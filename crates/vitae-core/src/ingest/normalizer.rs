use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical prefix every bullet glyph is rewritten to.
pub const BULLET_MARKER: &str = "• ";

const BULLET_GLYPHS: &[char] = &[
    '•', '●', '▪', '■', '◦', '‣', '∙', '·', '➢', '➤', '►', '✓', '✔', '❖',
];

/// Glyphs that only count as bullets when followed by whitespace.
const ASCII_BULLETS: &[char] = &['*', '-'];

const SEPARATOR_CHARS: &[char] = &['-', '_', '=', '*', '#', '~'];

static PAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^page\s+\d{1,4}(?:\s*(?:of|/)\s*\d{1,4})?$").expect("valid regex")
});

static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-\s*\d{1,3}\s*-|\d{1,3}|\d{1,3}\s*/\s*\d{1,3})$").expect("valid regex")
});

/// One logical line, tagged with its 0-based line number in the loaded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
}

impl Line {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    pub fn is_bullet(&self) -> bool {
        self.text.starts_with(BULLET_MARKER)
    }

    /// Text with the bullet marker removed.
    pub fn content(&self) -> &str {
        self.text.strip_prefix(BULLET_MARKER).unwrap_or(&self.text)
    }
}

/// Ordered, non-empty, trimmed lines. Gaps between consecutive `index`
/// values mark where blank lines or stripped artifacts stood.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    lines: Vec<Line>,
}

impl NormalizedText {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a NormalizedText {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageArtifact {
    /// "Page 2", "Page 2 of 3"
    Label,
    /// "2", "- 2 -", "2/3"
    Number,
}

struct CleanLine {
    line: Line,
    artifact: Option<PageArtifact>,
}

pub fn normalize(text: &str) -> NormalizedText {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: Vec<CleanLine> = text
        .split('\n')
        .enumerate()
        .filter_map(|(index, raw)| clean_line(index, raw))
        .collect();

    // A lone number is as likely to be content as a page footer.
    let bare_numbers = cleaned
        .iter()
        .filter(|c| c.artifact == Some(PageArtifact::Number))
        .count();

    let lines = cleaned
        .into_iter()
        .filter(|c| match c.artifact {
            Some(PageArtifact::Label) => false,
            Some(PageArtifact::Number) => bare_numbers < 2,
            None => true,
        })
        .map(|c| c.line)
        .collect();

    NormalizedText { lines }
}

fn clean_line(index: usize, raw: &str) -> Option<CleanLine> {
    let text: String = raw
        .chars()
        .filter_map(|c| match c {
            '\u{95}' => Some('•'),
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => None,
            c if c.is_whitespace() => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.is_empty() || is_separator(&text) {
        return None;
    }

    let artifact = if PAGE_LABEL.is_match(&text) {
        Some(PageArtifact::Label)
    } else if PAGE_NUMBER.is_match(&text) {
        Some(PageArtifact::Number)
    } else {
        None
    };

    let text = match strip_bullet(&text) {
        Some("") => return None,
        Some(rest) => format!("{BULLET_MARKER}{rest}"),
        None => text,
    };

    Some(CleanLine {
        line: Line::new(index, text),
        artifact,
    })
}

/// Content after a leading bullet glyph, or `None` if the line is not a
/// bullet item.
fn strip_bullet(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    let rest = &text[first.len_utf8()..];

    if BULLET_GLYPHS.contains(&first) {
        return Some(rest.trim_start());
    }
    if ASCII_BULLETS.contains(&first) && (rest.is_empty() || rest.starts_with(' ')) {
        return Some(rest.trim_start());
    }
    None
}

fn is_separator(text: &str) -> bool {
    let marks = text.chars().filter(|c| !c.is_whitespace()).count();
    marks >= 3
        && text
            .chars()
            .all(|c| c.is_whitespace() || SEPARATOR_CHARS.contains(&c))
}
