//! Date keys used to partition accounts by the day they were added.

use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Accepted input formats, in order of preference.
const INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%Y%m%d"];

const CANONICAL_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%B %d, %Y";

/// Zero-padded `(year, month, day)` partition key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateKey {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DateKey {
    pub fn to_date(&self) -> Option<NaiveDate> {
        let y = self.year.parse().ok()?;
        let m = self.month.parse().ok()?;
        let d = self.day.parse().ok()?;
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// `YYYY/MM/DD`.
    pub fn parse_path(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('/');
        let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?).map(|d| key_of(&d))
    }

    /// `YYYYMMDD`, compact enough for callback payloads.
    pub fn compact(&self) -> String {
        format!("{}{}{}", self.year, self.month, self.day)
    }

    pub fn from_compact(s: &str) -> Option<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(|d| key_of(&d))
    }

    pub fn to_iso(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.month, self.day)
    }
}

pub fn key_of(date: &NaiveDate) -> DateKey {
    DateKey {
        year: format!("{:04}", date.year()),
        month: format!("{:02}", date.month()),
        day: format!("{:02}", date.day()),
    }
}

pub fn parse(date_str: &str) -> Option<NaiveDate> {
    let s = date_str.trim();
    if s.is_empty() {
        return None;
    }
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub fn format_canonical(date: &NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// "January 02, 2024"; the input is returned unchanged when it does not parse.
pub fn format_for_display(date_str: &str) -> String {
    match parse(date_str) {
        Some(d) => d.format(DISPLAY_FORMAT).to_string(),
        None => date_str.to_string(),
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn relative_description(date: &NaiveDate, today: &NaiveDate) -> String {
    let days = today.signed_duration_since(*date).num_days();
    match days {
        d if d < 0 => date.format(DISPLAY_FORMAT).to_string(),
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=13 => "1 week ago".to_string(),
        14..=29 => format!("{} weeks ago", days / 7),
        30..=59 => "1 month ago".to_string(),
        60..=364 => format!("{} months ago", days / 30),
        _ => date.format(DISPLAY_FORMAT).to_string(),
    }
}
