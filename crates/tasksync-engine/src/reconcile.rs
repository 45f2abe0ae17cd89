//! Origin → notes reconciliation.
//!
//! Both sides are keyed by task ID. Every active ID lands in exactly one of
//! three partitions:
//!
//! | Partition | Meaning | Effect on the merged set |
//! |-----------|---------|--------------------------|
//! | new | in origin only | appended, scores blank |
//! | orphan | in notes only | kept, reported |
//! | common | in both | structural fields overwritten from origin |
//!
//! Origin is authoritative for identity, link, title and the three date
//! fields. Weight and assignee belong to the editors: they are never
//! overwritten, and a disagreement is reported as a [`Discrepancy`].
//!
//! The archive marker is read per side. An ID that is live in origin but
//! archived in notes is common: the notes row is restored, taking its `Lista`
//! from origin. An ID live in notes but archived in origin is an orphan. IDs
//! with no live record on either side are reported as archived, and archived
//! notes rows are carried through the merged set unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use tasksync_core::{columns, names, numeric, RecordSet, TaskId, TaskRecord};

/// Editor-owned field whose values disagree between the two sides
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiscrepancyField {
    Weight,
    Assignee,
}

impl DiscrepancyField {
    pub fn column(self) -> &'static str {
        match self {
            DiscrepancyField::Weight => columns::WEIGHT,
            DiscrepancyField::Assignee => columns::ASSIGNEE,
        }
    }
}

impl std::fmt::Display for DiscrepancyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// A flagged disagreement, left for an editor to resolve
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub id: TaskId,
    pub field: DiscrepancyField,
    pub origin: String,
    pub destination: String,
}

/// Result of reconciling origin into the notes set
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Notes set after applying new records and authoritative overwrites
    pub merged: RecordSet,
    /// IDs copied from origin, in origin order
    pub new_ids: Vec<TaskId>,
    /// IDs present only in the notes set, in notes order
    pub orphan_ids: Vec<TaskId>,
    /// IDs present on both sides, in notes order
    pub common_ids: Vec<TaskId>,
    /// Common IDs whose authoritative fields changed
    pub overwritten_ids: Vec<TaskId>,
    pub discrepancies: Vec<Discrepancy>,
    /// IDs with no live record on either side
    pub archived_ids: Vec<TaskId>,
}

impl Reconciliation {
    /// Whether the merged set differs from the stored notes set
    pub fn needs_write(&self) -> bool {
        !self.new_ids.is_empty() || !self.overwritten_ids.is_empty()
    }

    /// Distinct IDs with at least one discrepancy
    pub fn discrepancy_ids(&self) -> BTreeSet<TaskId> {
        self.discrepancies.iter().map(|d| d.id.clone()).collect()
    }
}

/// Reconcile `origin` into `destination`.
///
/// Both inputs are expected to be loaded with first-occurrence
/// deduplication; if an ID still repeats, the first occurrence is used.
pub fn reconcile(origin: &RecordSet, destination: &RecordSet) -> Reconciliation {
    let origin_index = active_first_occurrences(&origin.records);
    let destination_index = active_first_occurrences(&destination.records);
    let archived: BTreeSet<TaskId> = origin
        .records
        .iter()
        .chain(&destination.records)
        .filter(|r| r.is_archived())
        .map(|r| r.id.clone())
        .filter(|id| {
            !origin_index.contains_key(id.as_str()) && !destination_index.contains_key(id.as_str())
        })
        .collect();

    let mut merged = destination.clone();
    let mut common_ids = Vec::new();
    let mut orphan_ids = Vec::new();
    let mut overwritten_ids = Vec::new();
    let mut discrepancies = Vec::new();
    let mut seen = BTreeSet::new();

    let mut kept = Vec::with_capacity(merged.records.len());
    for mut record in std::mem::take(&mut merged.records) {
        let source = origin_index.get(record.id.as_str()).copied();
        if record.is_archived() {
            // A row archived here but live upstream is restored in place.
            let restore = source.filter(|_| {
                !destination_index.contains_key(record.id.as_str()) && seen.insert(record.id.clone())
            });
            if let Some(source) = restore {
                debug!(id = %record.id, "restoring archived notes row");
                common_ids.push(record.id.clone());
                discrepancies.extend(compare_editor_fields(source, &record));
                overwrite_authoritative(&mut record, source, &destination.columns);
                record.list.clone_from(&source.list);
                overwritten_ids.push(record.id.clone());
            }
            kept.push(record);
            continue;
        }
        if !seen.insert(record.id.clone()) {
            continue;
        }
        match source {
            Some(source) => {
                common_ids.push(record.id.clone());
                discrepancies.extend(compare_editor_fields(source, &record));
                if overwrite_authoritative(&mut record, source, &destination.columns) {
                    overwritten_ids.push(record.id.clone());
                }
            }
            None => orphan_ids.push(record.id.clone()),
        }
        kept.push(record);
    }
    merged.records = kept;

    let mut new_ids = Vec::new();
    let mut emitted = BTreeSet::new();
    for record in &origin.records {
        let id = record.id.as_str();
        if record.is_archived() || seen.contains(id) || !emitted.insert(id) {
            continue;
        }
        merged.records.push(project_new(record, destination));
        new_ids.push(record.id.clone());
    }

    if !new_ids.is_empty() {
        info!(bucket = %destination.bucket, count = new_ids.len(), "new tasks from origin");
    }
    debug!(
        common = common_ids.len(),
        orphans = orphan_ids.len(),
        overwritten = overwritten_ids.len(),
        discrepancies = discrepancies.len(),
        archived = archived.len(),
        "reconciled"
    );

    Reconciliation {
        merged,
        new_ids,
        orphan_ids,
        common_ids,
        overwritten_ids,
        discrepancies,
        archived_ids: archived.into_iter().collect(),
    }
}

/// First non-archived record per ID
fn active_first_occurrences(records: &[TaskRecord]) -> BTreeMap<&str, &TaskRecord> {
    let mut index = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_archived()) {
        index.entry(record.id.as_str()).or_insert(record);
    }
    index
}

/// Copy origin-owned fields that the destination layout holds.
/// Returns whether anything changed.
fn overwrite_authoritative(dest: &mut TaskRecord, source: &TaskRecord, layout: &[String]) -> bool {
    let has = |name: &str| layout.iter().any(|c| c == name);
    let mut changed = false;

    if dest.link != source.link {
        dest.link.clone_from(&source.link);
        changed |= has(columns::LINK);
    }
    if has(columns::TITLE) && dest.title != source.title {
        dest.title.clone_from(&source.title);
        changed = true;
    }
    for (column, target, value) in [
        (columns::START, &mut dest.start, source.start),
        (columns::END, &mut dest.end, source.end),
        (columns::DUE, &mut dest.due, source.due),
    ] {
        if has(column) && *target != value {
            *target = value;
            changed = true;
        }
    }
    changed
}

/// Weight compares numerically, assignee by folded first name. A blank on
/// either side is not a disagreement.
fn compare_editor_fields(source: &TaskRecord, dest: &TaskRecord) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    if let (Some(a), Some(b)) = (source.weight, dest.weight) {
        if a != b {
            found.push(Discrepancy {
                id: dest.id.clone(),
                field: DiscrepancyField::Weight,
                origin: numeric::format(a),
                destination: numeric::format(b),
            });
        }
    }

    let (a, b) = (source.assignee.trim(), dest.assignee.trim());
    if !a.is_empty() && !b.is_empty() && !names::same_person(a, b) {
        found.push(Discrepancy {
            id: dest.id.clone(),
            field: DiscrepancyField::Assignee,
            origin: a.to_string(),
            destination: b.to_string(),
        });
    }

    found
}

/// Origin record shaped to the destination layout: destination-only columns
/// start blank, leader scores only carry over when origin has that column.
fn project_new(source: &TaskRecord, destination: &RecordSet) -> TaskRecord {
    let mut record = source.clone();
    record.scores = destination
        .leaders
        .iter()
        .map(|leader| (leader.clone(), source.scores.get(leader).copied().flatten()))
        .collect();
    record.extra = destination
        .columns
        .iter()
        .filter(|c| !destination.leaders.contains(*c))
        .filter_map(|c| source.extra.get(c).map(|v| (c.clone(), v.clone())))
        .collect();
    record
}
