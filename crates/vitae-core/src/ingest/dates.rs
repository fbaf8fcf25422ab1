use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Month;
use regex::{Captures, Regex};

use crate::record::{DateEnd, DateRange, PartialDate};

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:
            (?P<month_name>jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?
                |aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)
                \.?,?(?:\s*(?P<named_year>(?:19|20)\d{2}))?
          | (?P<slash_month>0?[1-9]|1[0-2])(?:/(?:0?[1-9]|[12]\d|3[01]))?/(?P<slash_year>(?:19|20)\d{2})
          | (?P<dash_month>0?[1-9]|1[0-2])-(?P<dash_year>(?:19|20)\d{2})
          | (?P<iso_year>(?:19|20)\d{2})-(?P<iso_month>0[1-9]|1[0-2])
          | (?P<year>(?:19|20)\d{2})
          | (?P<open>present|current|now|ongoing|today|date)
        )\b",
    )
    .expect("valid regex")
});

static RANGE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:-{1,2}|–|—|~|to|until|till|through)\s*$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// A month name with no year attached, as in "June - August 2020".
    Month(u32),
    Date(PartialDate),
    Open,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    span: Range<usize>,
}

/// A date range found in a larger string, with the byte span it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeMatch {
    pub range: DateRange,
    pub span: Range<usize>,
}

pub fn parse_date_range(text: &str) -> Option<DateRange> {
    find_date_range(text).map(|m| m.range)
}

/// First date range in `text`. A lone date yields a range starting and
/// ending on it; a range ending before it starts is rejected.
pub fn find_date_range(text: &str) -> Option<DateRangeMatch> {
    let tokens: Vec<Spanned> = DATE_TOKEN
        .captures_iter(text)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            parse_token(&caps).map(|token| Spanned { token, span })
        })
        .collect();

    for pair in tokens.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if !RANGE_SEPARATOR.is_match(&text[first.span.end..second.span.start]) {
            continue;
        }

        let end = match second.token {
            Token::Date(date) => DateEnd::Date(date),
            Token::Open => DateEnd::Present,
            Token::Month(_) => continue,
        };
        let start = match (first.token, end) {
            (Token::Date(date), _) => date,
            (Token::Month(month), DateEnd::Date(end)) => PartialDate::month_year(month, end.year),
            _ => continue,
        };

        return DateRange::new(start, end).map(|range| DateRangeMatch {
            range,
            span: first.span.start..second.span.end,
        });
    }

    tokens.iter().find_map(|t| match t.token {
        Token::Date(date) => Some(DateRangeMatch {
            range: DateRange {
                start: date,
                end: DateEnd::Date(date),
            },
            span: t.span.clone(),
        }),
        _ => None,
    })
}

fn parse_token(caps: &Captures<'_>) -> Option<Token> {
    let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<i32>().ok());

    if let Some(name) = caps.name("month_name") {
        let month = month_number(name.as_str())?;
        return Some(match year("named_year") {
            Some(y) => Token::Date(PartialDate::month_year(month, y)),
            None => Token::Month(month),
        });
    }
    if let (Some(m), Some(y)) = (number("slash_month"), year("slash_year")) {
        return Some(Token::Date(PartialDate::month_year(m, y)));
    }
    if let (Some(m), Some(y)) = (number("dash_month"), year("dash_year")) {
        return Some(Token::Date(PartialDate::month_year(m, y)));
    }
    if let (Some(m), Some(y)) = (number("iso_month"), year("iso_year")) {
        return Some(Token::Date(PartialDate::month_year(m, y)));
    }
    if let Some(y) = year("year") {
        return Some(Token::Date(PartialDate::year(y)));
    }
    caps.name("open").map(|_| Token::Open)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect();
    Month::from_str(&prefix).ok().map(|m| m.number_from_month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: PartialDate, end: DateEnd) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_month_year_to_present() {
        assert_eq!(
            parse_date_range("June 2020 - Present"),
            Some(range(PartialDate::month_year(6, 2020), DateEnd::Present))
        );
    }

    #[test]
    fn test_year_range() {
        assert_eq!(
            parse_date_range("2018 - 2020"),
            Some(range(
                PartialDate::year(2018),
                DateEnd::Date(PartialDate::year(2020))
            ))
        );
    }

    #[test]
    fn test_no_date() {
        assert_eq!(parse_date_range("not a date"), None);
        assert_eq!(parse_date_range(""), None);
    }

    #[test]
    fn test_separator_variants() {
        let expected = range(
            PartialDate::month_year(1, 2019),
            DateEnd::Date(PartialDate::month_year(3, 2021)),
        );
        for text in [
            "Jan 2019 – Mar 2021",
            "January 2019 — March 2021",
            "Jan. 2019 to Mar. 2021",
            "01/2019 - 03/2021",
            "2019-01 until 2021-03",
            "1-2019 ~ 3-2021",
            "01/15/2019 through 03/01/2021",
        ] {
            assert_eq!(parse_date_range(text), Some(expected), "{text}");
        }
    }

    #[test]
    fn test_open_markers() {
        for marker in ["Present", "current", "Now", "ongoing", "today", "Date"] {
            let text = format!("Sept 2019 - {marker}");
            assert_eq!(
                parse_date_range(&text),
                Some(range(PartialDate::month_year(9, 2019), DateEnd::Present)),
                "{text}"
            );
        }
    }

    #[test]
    fn test_month_inherits_end_year() {
        assert_eq!(
            parse_date_range("June - August 2020"),
            Some(range(
                PartialDate::month_year(6, 2020),
                DateEnd::Date(PartialDate::month_year(8, 2020))
            ))
        );
    }

    #[test]
    fn test_single_date() {
        let date = PartialDate::year(2021);
        assert_eq!(
            parse_date_range("Graduated 2021"),
            Some(range(date, DateEnd::Date(date)))
        );
    }

    #[test]
    fn test_reversed_range_is_none() {
        assert_eq!(parse_date_range("2020 - 2018"), None);
    }

    #[test]
    fn test_span_locates_range() {
        let text = "ABC Tech | Jun 2020 - Present";
        let found = find_date_range(text).unwrap();
        assert_eq!(&text[found.span], "Jun 2020 - Present");
    }

    #[test]
    fn test_numbers_that_are_not_years() {
        assert_eq!(parse_date_range("555-123-4567"), None);
        assert_eq!(parse_date_range("GPA: 3.8/4.0"), None);
    }
}
