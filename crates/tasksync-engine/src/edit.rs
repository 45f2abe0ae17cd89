//! Editor operations on the notes set.
//!
//! Editors may change the weight and the leader scores of a task, fix a
//! misspelled assignee across the sheet, promote a person to leader, or
//! delete a task. Everything else in the notes set is owned by origin.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use tasksync_core::{columns, identity, RecordSet, Table, TaskId};

/// Changes an editor made to one task
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordEdit {
    pub id: TaskId,
    /// `Some(None)` clears the weight
    pub weight: Option<Option<Decimal>>,
    /// Leader column → new score (`None` clears)
    pub scores: BTreeMap<String, Option<Decimal>>,
}

impl RecordEdit {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn weight(mut self, weight: Option<Decimal>) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn score(mut self, leader: impl Into<String>, score: Option<Decimal>) -> Self {
        self.scores.insert(leader.into(), score);
        self
    }
}

/// What [`apply_edits`] did
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    /// IDs with at least one changed cell
    pub changed: Vec<TaskId>,
    /// IDs not present in the notes set
    pub unknown: Vec<TaskId>,
    /// Score columns that are not leader columns (ignored)
    pub rejected_columns: Vec<String>,
}

impl EditOutcome {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Apply editor changes by ID. Only `Peso` and leader columns are writable.
pub fn apply_edits(notes: &mut RecordSet, edits: &[RecordEdit]) -> EditOutcome {
    let mut outcome = EditOutcome::default();
    let leaders = notes.leaders.clone();

    for edit in edits {
        let Some(record) = notes.get_mut(&edit.id) else {
            outcome.unknown.push(edit.id.clone());
            continue;
        };
        let mut changed = false;

        if let Some(weight) = edit.weight {
            if record.weight != weight {
                record.weight = weight;
                changed = true;
            }
        }
        for (column, score) in &edit.scores {
            if !leaders.contains(column) {
                if !outcome.rejected_columns.contains(column) {
                    outcome.rejected_columns.push(column.clone());
                }
                continue;
            }
            let slot = record.scores.entry(column.clone()).or_insert(None);
            if slot != score {
                *slot = *score;
                changed = true;
            }
        }

        if changed {
            outcome.changed.push(edit.id.clone());
        }
    }

    debug!(
        changed = outcome.changed.len(),
        unknown = outcome.unknown.len(),
        "applied edits"
    );
    outcome
}

/// Replace an exact assignee name. Returns the number of records changed.
pub fn rename_assignee(notes: &mut RecordSet, wrong: &str, right: &str) -> usize {
    let wrong = wrong.trim();
    let right = right.trim();
    if wrong == right {
        return 0;
    }
    let mut count = 0;
    for record in notes.records.iter_mut().filter(|r| r.assignee == wrong) {
        record.assignee = right.to_string();
        count += 1;
    }
    info!(from = wrong, to = right, count, "renamed assignee");
    count
}

/// Remove every row of `table` whose link resolves to `id`.
///
/// Works on the raw sheet so that unrelated rows are written back verbatim.
/// Returns the number of rows removed.
pub fn remove_rows_by_id(table: &mut Table, id: &str) -> usize {
    let Some(link_col) = table.column_index(columns::LINK) else {
        return 0;
    };
    let before = table.rows.len();
    table.rows.retain(|row| {
        row.get(link_col)
            .and_then(|link| identity::resolve(link))
            .map_or(true, |row_id| row_id != id)
    });
    before - table.rows.len()
}
