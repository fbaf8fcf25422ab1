use std::cmp::Ordering;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A date known to year, and possibly month, granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
}

impl PartialDate {
    #[must_use]
    pub const fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    #[must_use]
    pub const fn month_year(month: u32, year: i32) -> Self {
        Self {
            year,
            month: Some(month),
        }
    }

    /// Earliest month this date can denote.
    const fn lower_bound(self) -> (i32, u32) {
        match self.month {
            Some(m) => (self.year, m),
            None => (self.year, 1),
        }
    }

    /// Latest month this date can denote.
    const fn upper_bound(self) -> (i32, u32) {
        match self.month {
            Some(m) => (self.year, m),
            None => (self.year, 12),
        }
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{m:02}", self.year),
            None => write!(f, "{:04}", self.year),
        }
    }
}

/// End of a date range: a concrete date or the open-ended "present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateEnd {
    Date(PartialDate),
    Present,
}

impl Serialize for DateEnd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Date(date) => date.serialize(serializer),
            Self::Present => serializer.serialize_str("present"),
        }
    }
}

impl<'de> Deserialize<'de> for DateEnd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Marker(String),
            Date(PartialDate),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Date(date) => Ok(Self::Date(date)),
            Repr::Marker(s) if s.eq_ignore_ascii_case("present") => Ok(Self::Present),
            Repr::Marker(s) => Err(D::Error::custom(format!("unknown date end marker: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: PartialDate,
    pub end: DateEnd,
}

impl DateRange {
    /// Builds a range, rejecting one whose end precedes its start.
    #[must_use]
    pub fn new(start: PartialDate, end: DateEnd) -> Option<Self> {
        if let DateEnd::Date(end_date) = end {
            if end_date.upper_bound().cmp(&start.lower_bound()) == Ordering::Less {
                return None;
            }
        }
        Some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            DateEnd::Present => write!(f, "{} - present", self.start),
            DateEnd::Date(end) if end == self.start => write!(f, "{}", self.start),
            DateEnd::Date(end) => write!(f, "{} - {end}", self.start),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<PartialDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

/// The structured result of one extraction. List fields are always present,
/// possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeRecord {
    pub name: Option<String>,
    pub email: Vec<String>,
    pub phone: Vec<String>,
    pub linkedin: Option<String>,
    pub websites: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub skills: Vec<String>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
}

impl ResumeRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_range_serializes_present_marker() {
        let range = DateRange::new(PartialDate::month_year(6, 2020), DateEnd::Present).unwrap();
        let json = serde_json::to_value(range).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "start": { "year": 2020, "month": 6 }, "end": "present" })
        );

        let parsed: DateRange = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, range);
    }

    #[test]
    fn test_unknown_end_marker_rejected() {
        let json = serde_json::json!({ "start": { "year": 2020 }, "end": "someday" });
        assert!(serde_json::from_value::<DateRange>(json).is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let start = PartialDate::year(2020);
        assert!(DateRange::new(start, DateEnd::Date(PartialDate::year(2018))).is_none());
        assert!(DateRange::new(start, DateEnd::Date(PartialDate::year(2020))).is_some());
        // Year-only start overlaps any month of the same year.
        assert!(DateRange::new(start, DateEnd::Date(PartialDate::month_year(1, 2020))).is_some());
        assert!(DateRange::new(
            PartialDate::month_year(6, 2020),
            DateEnd::Date(PartialDate::month_year(5, 2020))
        )
        .is_none());
    }

    #[test]
    fn test_empty_record_serializes_every_list() {
        let json = serde_json::to_value(ResumeRecord::default()).unwrap();
        for key in [
            "email",
            "phone",
            "websites",
            "education",
            "experience",
            "skills",
            "projects",
            "certifications",
        ] {
            assert_eq!(json[key], serde_json::json!([]), "{key} should be an empty list");
        }
        assert!(json["name"].is_null());
        assert!(json["linkedin"].is_null());
    }

    #[test]
    fn test_display() {
        let range = DateRange::new(PartialDate::year(2018), DateEnd::Date(PartialDate::year(2020)))
            .unwrap();
        assert_eq!(range.to_string(), "2018 - 2020");
        let open = DateRange::new(PartialDate::month_year(6, 2020), DateEnd::Present).unwrap();
        assert_eq!(open.to_string(), "2020-06 - present");
    }
}
