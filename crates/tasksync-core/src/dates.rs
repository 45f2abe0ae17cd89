//! Date normalization for free-text date cells.
//!
//! Cells arrive in several shapes: day-first (`15/03/2025`), ISO
//! (`2025-03-15`, sometimes with a time part), blank, or one of the
//! placeholder markers spreadsheets and exports leave behind. Day-first is
//! tried before ISO; anything that fails both is [`DateValue::Unknown`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Cell texts that mean "no date"
pub const UNKNOWN_MARKERS: [&str; 5] = ["None", "nan", "NaT", "0", "#N/A"];

/// A normalized date cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateValue {
    Known(NaiveDate),
    /// Blank, placeholder or unparsable text. Never re-parsed.
    #[default]
    Unknown,
}

impl DateValue {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            DateValue::Known(d) => Some(d),
            DateValue::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, DateValue::Known(_))
    }

    pub fn is_unknown(self) -> bool {
        !self.is_known()
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        DateValue::Known(date)
    }
}

/// Written back as `DD/MM/YYYY`, or blank when unknown
impl std::fmt::Display for DateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateValue::Known(d) => write!(f, "{}", format_day_first(*d)),
            DateValue::Unknown => Ok(()),
        }
    }
}

/// Normalize a date cell
pub fn normalize(text: &str) -> DateValue {
    let trimmed = text.trim();
    if trimmed.is_empty() || UNKNOWN_MARKERS.contains(&trimmed) {
        return DateValue::Unknown;
    }
    parse_day_first(trimmed)
        .or_else(|| parse_iso(trimmed))
        .map_or(DateValue::Unknown, DateValue::Known)
}

/// `DD/MM/YYYY`, with an optional time part after a space
fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let date_part = text.split_whitespace().next()?;
    let mut parts = date_part.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// `YYYY-MM-DD`, optionally followed by `T...` or ` ...` time text
fn parse_iso(text: &str) -> Option<NaiveDate> {
    let date_part = text.get(..10)?;
    let rest = &text[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Format as `DD/MM/YYYY`
pub fn format_day_first(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Monday through Friday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
