//! # tasksync-core
//!
//! Core record model for the tasksync reconciliation engine.
//!
//! This crate provides:
//! - Tabular boundary types: `Table` (rows of text cells with a header)
//! - Typed records: `TaskRecord`, `RecordSet`
//! - Leaf rules: identity resolution, date normalization, archive filtering,
//!   month bucket classification and the leader roster
//! - The `SheetStore` seam and an in-memory implementation
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use tasksync_core::{Dedup, RecordSet, Table};
//!
//! let table = Table::from_values(vec![
//!     vec!["Link".into(), "Encarregado".into(), "Data Final".into(), "Lista".into()],
//!     vec!["https://x/todos/42".into(), "Ana".into(), "15/03/2025".into(), "".into()],
//! ]);
//! let (set, report) = RecordSet::from_table("Origem", &table, &BTreeSet::new(), Dedup::KeepFirst).unwrap();
//! assert_eq!(set.records[0].id, "42");
//! assert_eq!(report.invalid_ids, 0);
//! ```

pub mod archive;
pub mod bucket;
pub mod dates;
pub mod identity;
pub mod names;
pub mod numeric;
pub mod roster;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use dates::DateValue;
pub use store::{MemoryStore, SheetStore};

// ============================================================================
// Type Aliases
// ============================================================================

/// Stable task identifier, derived from the permalink
pub type TaskId = String;

/// Well-known column names of the task sheets
pub mod columns {
    pub const ID: &str = "ID";
    pub const LINK: &str = "Link";
    pub const TITLE: &str = "Tarefa";
    pub const ASSIGNEE: &str = "Encarregado";
    pub const WEIGHT: &str = "Peso";
    pub const START: &str = "Data Inicial";
    pub const END: &str = "Data Final";
    pub const DUE: &str = "Data Estipulada";
    pub const LIST: &str = "Lista";

    /// Columns that must be present in every task sheet
    pub const REQUIRED: [&str; 3] = [LINK, LIST, END];
}

// ============================================================================
// Table
// ============================================================================

/// A rectangular sheet: one header row plus text rows of the same width
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header
    pub fn with_header<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from raw cell values as read from a sheet.
    ///
    /// The first row is the header. Repeated header names get `.1`, `.2`, ...
    /// suffixes, columns with an empty header are dropped, and every data row
    /// is padded or truncated to the header width.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let Some(raw_headers) = iter.next() else {
            return Self::default();
        };

        let kept: Vec<usize> = raw_headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let headers = kept
            .iter()
            .map(|&i| {
                let name = raw_headers[i].trim().to_string();
                let count = seen.entry(name.clone()).or_insert(0);
                let unique = if *count == 0 {
                    name
                } else {
                    format!("{}.{}", name, count)
                };
                *count += 1;
                unique
            })
            .collect();

        let rows = iter
            .map(|row| {
                kept.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Header plus rows, ready to be written back to a sheet
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.headers.clone());
        values.extend(self.rows.iter().cloned());
        values
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell text at `row` for the named column, empty if absent
    pub fn cell(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .map_or("", String::as_str)
    }

    /// Append a column (no-op if it exists), filling existing rows with blanks
    pub fn add_column(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Task Records
// ============================================================================

/// A validated task row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Derived from the last path segment of `link`
    pub id: TaskId,
    pub link: String,
    pub title: String,
    pub assignee: String,
    /// Numeric weight; blank or non-numeric text loads as `None`
    pub weight: Option<Decimal>,
    pub start: DateValue,
    pub end: DateValue,
    pub due: DateValue,
    /// List label; may carry the archived marker
    pub list: String,
    /// Leader score columns, keyed by the sheet's column name
    pub scores: BTreeMap<String, Option<Decimal>>,
    /// Every other column, kept as opaque text
    pub extra: BTreeMap<String, String>,
}

impl TaskRecord {
    /// Create a record with only an identity; other fields blank
    pub fn new(id: impl Into<TaskId>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: link.into(),
            title: String::new(),
            assignee: String::new(),
            weight: None,
            start: DateValue::Unknown,
            end: DateValue::Unknown,
            due: DateValue::Unknown,
            list: String::new(),
            scores: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Text representation of the named column
    pub fn cell(&self, column: &str) -> String {
        match column {
            columns::ID => self.id.clone(),
            columns::LINK => self.link.clone(),
            columns::TITLE => self.title.clone(),
            columns::ASSIGNEE => self.assignee.clone(),
            columns::WEIGHT => numeric::format_optional(self.weight),
            columns::START => self.start.to_string(),
            columns::END => self.end.to_string(),
            columns::DUE => self.due.to_string(),
            columns::LIST => self.list.clone(),
            other => match self.scores.get(other) {
                Some(score) => numeric::format_optional(*score),
                None => self.extra.get(other).cloned().unwrap_or_default(),
            },
        }
    }

    /// Sum of all leader scores carried by this record
    pub fn leader_points(&self) -> Decimal {
        self.scores.values().flatten().copied().sum()
    }

    pub fn is_archived(&self) -> bool {
        archive::is_archived(&self.list)
    }
}

/// How duplicate IDs are treated when loading a record set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dedup {
    /// Keep the first occurrence of each ID (editing and comparison)
    KeepFirst,
    /// Keep every row (stacked snapshots)
    KeepAll,
}

/// What was dropped while loading a record set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Rows whose link resolved to an empty ID
    pub invalid_ids: usize,
    /// IDs that appeared more than once (later rows dropped)
    pub duplicates: Vec<TaskId>,
}

/// The records of one bucket, with the bucket's column layout
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSet {
    /// Bucket the records were loaded from
    pub bucket: String,
    /// Column order used when writing back
    pub columns: Vec<String>,
    /// Columns holding leader scores
    pub leaders: BTreeSet<String>,
    pub records: Vec<TaskRecord>,
}

impl RecordSet {
    /// An empty set with the given layout
    pub fn empty(bucket: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            bucket: bucket.into(),
            columns,
            leaders: BTreeSet::new(),
            records: Vec::new(),
        }
    }

    /// Validate and type a sheet.
    ///
    /// `leader_names` are lower-cased roster names; any column whose
    /// lower-cased name is in the set is treated as a numeric score column.
    pub fn from_table(
        bucket: &str,
        table: &Table,
        leader_names: &BTreeSet<String>,
        dedup: Dedup,
    ) -> Result<(Self, LoadReport), SyncError> {
        for field in columns::REQUIRED {
            if !table.has_column(field) {
                return Err(SyncError::MissingField {
                    field: field.to_string(),
                    bucket: bucket.to_string(),
                });
            }
        }

        let leaders: BTreeSet<String> = table
            .headers
            .iter()
            .filter(|h| leader_names.contains(&h.to_lowercase()))
            .cloned()
            .collect();

        let mut report = LoadReport::default();
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(table.len());

        for row in &table.rows {
            let record = record_from_row(&table.headers, row, &leaders);
            let Some(record) = record else {
                report.invalid_ids += 1;
                continue;
            };
            if dedup == Dedup::KeepFirst && !seen.insert(record.id.clone()) {
                report.duplicates.push(record.id);
                continue;
            }
            records.push(record);
        }

        if report.invalid_ids > 0 {
            warn!(bucket, count = report.invalid_ids, "dropped rows with empty task ID");
        }
        if !report.duplicates.is_empty() {
            warn!(bucket, count = report.duplicates.len(), "dropped duplicate task IDs");
        }
        debug!(bucket, records = records.len(), leaders = leaders.len(), "loaded record set");

        Ok((
            Self {
                bucket: bucket.to_string(),
                columns: table.headers.clone(),
                leaders,
                records,
            },
            report,
        ))
    }

    /// Render back to a sheet using this set's column layout
    pub fn to_table(&self) -> Table {
        Table {
            headers: self.columns.clone(),
            rows: self
                .records
                .iter()
                .map(|r| self.columns.iter().map(|c| r.cell(c)).collect())
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    pub fn ids(&self) -> BTreeSet<TaskId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Distinct assignee names, sorted
    pub fn assignees(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.assignee.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Add a score column to the layout and to every record
    pub fn add_leader_column(&mut self, name: &str) -> bool {
        if self.columns.iter().any(|c| c == name) {
            self.leaders.insert(name.to_string());
            return false;
        }
        self.columns.push(name.to_string());
        self.leaders.insert(name.to_string());
        for record in &mut self.records {
            record.extra.remove(name);
            record.scores.insert(name.to_string(), None);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn record_from_row(
    headers: &[String],
    row: &[String],
    leaders: &BTreeSet<String>,
) -> Option<TaskRecord> {
    let mut link = String::new();
    let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
    for (header, value) in headers.iter().zip(row) {
        if header == columns::LINK {
            link = value.clone();
        }
        fields.insert(header.as_str(), value.as_str());
    }

    let id = identity::resolve(&link)?;
    let mut record = TaskRecord::new(id, link.trim());

    for (header, value) in fields {
        match header {
            columns::ID | columns::LINK => {}
            columns::TITLE => record.title = value.to_string(),
            columns::ASSIGNEE => record.assignee = value.trim().to_string(),
            columns::WEIGHT => record.weight = numeric::parse(value),
            columns::START => record.start = dates::normalize(value),
            columns::END => record.end = dates::normalize(value),
            columns::DUE => record.due = dates::normalize(value),
            columns::LIST => record.list = value.to_string(),
            other if leaders.contains(other) => {
                record.scores.insert(other.to_string(), numeric::parse(value));
            }
            other => {
                record.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    Some(record)
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Missing required field '{field}' in bucket '{bucket}'")]
    MissingField { field: String, bucket: String },

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Not a month bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Task '{id}' not found in {buckets}")]
    UnknownTask { id: TaskId, buckets: String },

    #[error("'{0}' is not listed in the roster")]
    NotInRoster(String),

    #[error("Invalid table in bucket '{bucket}': {message}")]
    InvalidTable { bucket: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by the backing sheet store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport failure on '{sheet}': {message}")]
    Transport { sheet: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),
}

impl StoreError {
    /// Whether retrying the same read may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transport { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
