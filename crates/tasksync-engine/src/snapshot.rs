//! Weekly counters, the history sheet, and consolidated snapshots.
//!
//! # History
//!
//! One row per business day, keyed by its `DD/MM/YYYY` date:
//!
//! ```text
//! Data        Total_Fechadas  Total_Tarefas
//! 13/10/2025  4               11
//! 14/10/2025  6               11
//! ```
//!
//! Recording the same day twice overwrites that day's counters.
//!
//! # Consolidation
//!
//! Month sheets are stacked into one table with a `Fonte` column naming the
//! source sheet. Rows are not deduplicated across sources. Re-stacking a
//! source replaces that source's earlier rows and leaves the others alone.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tracing::debug;

use tasksync_core::dates::{format_day_first, is_business_day, week_start};
use tasksync_core::{archive, columns, SyncError, Table, TaskRecord};

pub const DATE_COLUMN: &str = "Data";
pub const CLOSED_COLUMN: &str = "Total_Fechadas";
pub const TOTAL_COLUMN: &str = "Total_Tarefas";

/// History sheet layout, in order
pub const HISTORY_COLUMNS: [&str; 3] = [DATE_COLUMN, CLOSED_COLUMN, TOTAL_COLUMN];

/// Column naming the source sheet of a consolidated row
pub const SOURCE_COLUMN: &str = "Fonte";

// ============================================================================
// Aggregation
// ============================================================================

/// Point-in-time counters for one week
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Records listed under the week
    pub total: u64,
    /// Of those, records with a concrete `Data Final`
    pub closed: u64,
}

/// Outcome of [`aggregate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Aggregate {
    Counted {
        as_of: NaiveDate,
        week_start: NaiveDate,
        counters: Counters,
    },
    /// `as_of` falls on a weekend; nothing is counted or recorded
    Skipped { as_of: NaiveDate, weekday: Weekday },
}

/// Count the records listed under the week of `as_of`.
///
/// A record is listed under a week when its `Lista` label contains the
/// week's Monday as `DD/MM/YYYY`. Archived records are ignored.
pub fn aggregate(records: &[TaskRecord], as_of: NaiveDate) -> Aggregate {
    if !is_business_day(as_of) {
        return Aggregate::Skipped {
            as_of,
            weekday: as_of.weekday(),
        };
    }

    let monday = week_start(as_of);
    let label = format_day_first(monday);
    let mut counters = Counters::default();
    for record in archive::active(records).filter(|r| r.list.contains(&label)) {
        counters.total += 1;
        if record.end.is_known() {
            counters.closed += 1;
        }
    }
    debug!(%as_of, week = %label, total = counters.total, closed = counters.closed, "aggregated week");

    Aggregate::Counted {
        as_of,
        week_start: monday,
        counters,
    }
}

// ============================================================================
// History
// ============================================================================

/// One recorded business day
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    /// Row key, `DD/MM/YYYY`
    pub date: String,
    pub closed: u64,
    pub total: u64,
}

/// What [`History::upsert`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

/// The history sheet
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct History {
    pub rows: Vec<HistoryRow>,
}

impl History {
    /// Load from a sheet. A sheet with no header is an empty history.
    pub fn from_table(bucket: &str, table: &Table) -> Result<Self, SyncError> {
        if table.headers.is_empty() {
            return Ok(Self::default());
        }
        for column in HISTORY_COLUMNS {
            if !table.has_column(column) {
                return Err(SyncError::MissingField {
                    field: column.to_string(),
                    bucket: bucket.to_string(),
                });
            }
        }

        let count = |row: usize, column: &str| -> Result<u64, SyncError> {
            let text = table.cell(row, column).trim();
            if text.is_empty() {
                return Ok(0);
            }
            text.parse().map_err(|_| SyncError::InvalidTable {
                bucket: bucket.to_string(),
                message: format!("row {}: '{}' is not a count in {}", row + 2, text, column),
            })
        };

        let mut rows = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let date = table.cell(row, DATE_COLUMN).trim();
            if date.is_empty() {
                continue;
            }
            rows.push(HistoryRow {
                date: date.to_string(),
                closed: count(row, CLOSED_COLUMN)?,
                total: count(row, TOTAL_COLUMN)?,
            });
        }
        Ok(Self { rows })
    }

    pub fn to_table(&self) -> Table {
        Table {
            headers: HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| vec![r.date.clone(), r.closed.to_string(), r.total.to_string()])
                .collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&HistoryRow> {
        let key = format_day_first(date);
        self.rows.iter().find(|r| r.date == key)
    }

    /// Overwrite the row for `date`, or append one
    pub fn upsert(&mut self, date: NaiveDate, counters: Counters) -> Upsert {
        let key = format_day_first(date);
        match self.rows.iter_mut().find(|r| r.date == key) {
            Some(row) if row.closed == counters.closed && row.total == counters.total => {
                Upsert::Unchanged
            }
            Some(row) => {
                row.closed = counters.closed;
                row.total = counters.total;
                Upsert::Updated
            }
            None => {
                self.rows.push(HistoryRow {
                    date: key,
                    closed: counters.closed,
                    total: counters.total,
                });
                Upsert::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Consolidation
// ============================================================================

/// Stack `sources` onto `existing`, replacing earlier rows of the same sources.
///
/// Archived rows of the sources are dropped. Columns are the union of all
/// headers in first-seen order, with [`SOURCE_COLUMN`] last.
pub fn stack_snapshots(existing: &Table, sources: &[(String, Table)]) -> Table {
    let mut headers: Vec<String> = Vec::new();
    let mut push_header = |h: &String| {
        if h != SOURCE_COLUMN && !headers.contains(h) {
            headers.push(h.clone());
        }
    };
    existing.headers.iter().for_each(&mut push_header);
    for (_, table) in sources {
        table.headers.iter().for_each(&mut push_header);
    }
    headers.push(SOURCE_COLUMN.to_string());

    let replaced = |name: &str| sources.iter().any(|(s, _)| s == name);
    let mut rows = Vec::new();

    for row in 0..existing.len() {
        if replaced(existing.cell(row, SOURCE_COLUMN)) {
            continue;
        }
        rows.push(
            headers
                .iter()
                .map(|h| existing.cell(row, h).to_string())
                .collect(),
        );
    }

    for (name, table) in sources {
        let mut stacked = 0usize;
        for row in 0..table.len() {
            if archive::is_archived(table.cell(row, columns::LIST)) {
                continue;
            }
            rows.push(
                headers
                    .iter()
                    .map(|h| {
                        if h == SOURCE_COLUMN {
                            name.clone()
                        } else {
                            table.cell(row, h).to_string()
                        }
                    })
                    .collect(),
            );
            stacked += 1;
        }
        debug!(source = %name, rows = stacked, "stacked snapshot");
    }

    Table { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tasksync_core::DateValue;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, list: &str, closed: bool) -> TaskRecord {
        let mut r = TaskRecord::new(id, format!("l/{id}"));
        r.list = list.into();
        if closed {
            r.end = DateValue::Known(ymd(2025, 10, 14));
        }
        r
    }

    fn week_records() -> Vec<TaskRecord> {
        vec![
            record("1", "Semana 13/10/2025", true),
            record("2", "Semana 13/10/2025", false),
            record("3", "Semana 06/10/2025", true),
            record("4", "Semana 13/10/2025 [ARCHIVED]", true),
        ]
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn counts_week_of_as_of() {
        // Thursday of the week starting 13/10/2025
        let outcome = aggregate(&week_records(), ymd(2025, 10, 16));
        assert_eq!(
            outcome,
            Aggregate::Counted {
                as_of: ymd(2025, 10, 16),
                week_start: ymd(2025, 10, 13),
                counters: Counters { total: 2, closed: 1 },
            }
        );
    }

    #[test]
    fn weekend_is_skipped() {
        let outcome = aggregate(&week_records(), ymd(2025, 10, 18));
        assert_eq!(
            outcome,
            Aggregate::Skipped {
                as_of: ymd(2025, 10, 18),
                weekday: Weekday::Sat,
            }
        );
    }

    #[test]
    fn upsert_is_idempotent_per_day() {
        let mut history = History::default();
        let counters = Counters { total: 2, closed: 1 };
        assert_eq!(history.upsert(ymd(2025, 10, 16), counters), Upsert::Inserted);
        assert_eq!(history.upsert(ymd(2025, 10, 16), counters), Upsert::Unchanged);
        assert_eq!(history.len(), 1);

        let changed = Counters { total: 3, closed: 2 };
        assert_eq!(history.upsert(ymd(2025, 10, 16), changed), Upsert::Updated);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(ymd(2025, 10, 16)).unwrap().total, 3);

        history.upsert(ymd(2025, 10, 17), counters);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn history_table_layout() {
        let table = Table::from_values(vec![
            row(&["Data", "Total_Fechadas", "Total_Tarefas"]),
            row(&["13/10/2025", "4", "11"]),
            row(&["", "", ""]),
        ]);
        let history = History::from_table("Historico", &table).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.rows[0].closed, 4);
        assert_eq!(
            history.to_table().to_values()[..2].to_vec(),
            table.to_values()[..2].to_vec()
        );
    }

    #[test]
    fn history_rejects_bad_counts() {
        let table = Table::from_values(vec![
            row(&["Data", "Total_Fechadas", "Total_Tarefas"]),
            row(&["13/10/2025", "many", "11"]),
        ]);
        assert!(History::from_table("Historico", &table).is_err());
    }

    #[test]
    fn history_requires_layout() {
        let table = Table::from_values(vec![row(&["Data", "Total"])]);
        let err = History::from_table("Historico", &table).unwrap_err();
        assert!(err.to_string().contains("Total_Fechadas"));
    }

    #[test]
    fn stacking_keeps_duplicates_across_sources() {
        let oct = Table::from_values(vec![
            row(&["Link", "Lista"]),
            row(&["l/1", ""]),
            row(&["l/2", "x [ARCHIVED]"]),
        ]);
        let nov = Table::from_values(vec![
            row(&["Link", "Peso", "Lista"]),
            row(&["l/1", "3", ""]),
        ]);
        let stacked = stack_snapshots(
            &Table::default(),
            &[("Outubro 2025".into(), oct), ("Novembro 2025".into(), nov)],
        );
        assert_eq!(stacked.headers, row(&["Link", "Lista", "Peso", "Fonte"]));
        assert_eq!(
            stacked.rows,
            vec![
                row(&["l/1", "", "", "Outubro 2025"]),
                row(&["l/1", "", "3", "Novembro 2025"]),
            ]
        );
    }

    #[test]
    fn restacking_a_source_replaces_its_rows() {
        let nov = Table::from_values(vec![row(&["Link", "Lista"]), row(&["l/1", ""])]);
        let oct = Table::from_values(vec![row(&["Link", "Lista"]), row(&["l/9", ""])]);
        let first = stack_snapshots(
            &Table::default(),
            &[("Outubro 2025".into(), oct), ("Novembro 2025".into(), nov.clone())],
        );
        let second = stack_snapshots(&first, &[("Novembro 2025".into(), nov)]);
        assert_eq!(second.len(), 2);
        assert_eq!(second.rows[0][0], "l/9");
        assert_eq!(second.rows[1][0], "l/1");

        let third = stack_snapshots(&second, &[]);
        assert_eq!(third, second);
    }
}
