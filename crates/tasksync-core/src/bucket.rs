//! Month buckets and record classification.
//!
//! Month tabs are named `"<Month> <YYYY>"` using Portuguese month names. A
//! record belongs to a month bucket according to its `Data Final`:
//!
//! - current or future month: dated in that month, or undated
//! - past month: dated in that month only
//!
//! Undated tasks are presumed still open, so they are swept into the active
//! month but never into a month that has already closed.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{archive, SyncError, TaskRecord};

/// Month names used in bucket titles, January first
pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// A calendar month bucket. Serialized as its sheet name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthBucket {
    year: i32,
    /// 1-based, always within 1..=12
    month: u32,
}

impl MonthBucket {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Bucket containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a sheet title; `None` if it is not a month bucket name
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split_whitespace();
        let (month_name, year) = (parts.next()?, parts.next()?);
        if parts.next().is_some() || year.len() != 4 {
            return None;
        }
        let wanted = month_name.to_lowercase();
        let month = MONTH_NAMES.iter().position(|m| m.to_lowercase() == wanted)?;
        Some(Self {
            year: year.parse().ok()?,
            month: month as u32 + 1,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 1-based month number
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Current or future relative to `today`, at month granularity
    pub fn is_open(&self, today: NaiveDate) -> bool {
        *self >= Self::of(today)
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl FromStr for MonthBucket {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SyncError::InvalidBucketName(s.to_string()))
    }
}

impl TryFrom<String> for MonthBucket {
    type Error = SyncError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<MonthBucket> for String {
    fn from(bucket: MonthBucket) -> Self {
        bucket.to_string()
    }
}

/// Outcome of classifying a record against a month bucket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Membership {
    Belongs,
    Excluded,
}

/// Classify one record for `bucket`, with `today` deciding open vs. closed
pub fn classify(record: &TaskRecord, bucket: MonthBucket, today: NaiveDate) -> Membership {
    if archive::is_archived(&record.list) {
        return Membership::Excluded;
    }
    let belongs = match record.end.date() {
        Some(date) => bucket.contains(date),
        None => bucket.is_open(today),
    };
    if belongs {
        Membership::Belongs
    } else {
        Membership::Excluded
    }
}
