//! Archived record filtering.
//!
//! A record is archived when its `Lista` label carries the `[ARCHIVED]`
//! marker in any letter case. Archived records are removed before bucket
//! classification, reconciliation and aggregation.

use tracing::debug;

use crate::TaskRecord;

/// Marker searched for (lower-cased) in the list label
pub const ARCHIVED_MARKER: &str = "[archived]";

pub fn is_archived(list: &str) -> bool {
    list.to_lowercase().contains(ARCHIVED_MARKER)
}

/// Drop archived records, keeping order
pub fn filter(records: Vec<TaskRecord>) -> Vec<TaskRecord> {
    let before = records.len();
    let kept: Vec<TaskRecord> = records.into_iter().filter(|r| !r.is_archived()).collect();
    if kept.len() != before {
        debug!(archived = before - kept.len(), "filtered archived records");
    }
    kept
}

/// Borrowing variant of [`filter`]
pub fn active<'a>(records: &'a [TaskRecord]) -> impl Iterator<Item = &'a TaskRecord> + 'a {
    records.iter().filter(|r| !r.is_archived())
}
