//! Store-driven operations.
//!
//! Each function here is one complete request: read the sheets it needs,
//! run the rules from the other modules, and write whole replacements of
//! the sheets that changed. Nothing is written when an error occurs before
//! the write, and nothing is written when the result equals what is stored.
//! Every function returns a report of what it did so callers can refresh
//! whatever views they keep.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tracing::{info, warn};

use tasksync_core::bucket::MonthBucket;
use tasksync_core::dates::is_business_day;
use tasksync_core::roster::{Roster, StatusFilter};
use tasksync_core::store::read_with_retry;
use tasksync_core::{
    Dedup, LoadReport, RecordSet, SheetStore, SyncError, Table, TaskId,
};

use crate::edit::{self, EditOutcome, RecordEdit};
use crate::monthly::{self, MissingTask, MonthAudit};
use crate::reconcile::{reconcile, Discrepancy};
use crate::scoreboard::{self, Scoreboard};
use crate::snapshot::{self, Aggregate, Counters, History, Upsert};
use crate::EngineConfig;

// ============================================================================
// Loading helpers
// ============================================================================

fn read_optional<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    name: &str,
) -> Result<Option<Table>, SyncError> {
    Ok(read_with_retry(
        store,
        name,
        config.read_attempts,
        config.read_backoff(),
    )?)
}

fn read_required<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    name: &str,
) -> Result<Table, SyncError> {
    read_optional(&*store, config, name)?.ok_or_else(|| SyncError::BucketNotFound(name.to_string()))
}

/// The roster sheet; an absent sheet is an empty roster
pub fn load_roster<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
) -> Result<Roster, SyncError> {
    match read_optional(&*store, config, &config.sheets.roster)? {
        Some(table) => Ok(Roster::from_table(table)),
        None => {
            warn!(sheet = %config.sheets.roster, "roster sheet not found, no leader columns");
            Ok(Roster::empty())
        }
    }
}

fn load_set<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    name: &str,
    leaders: &BTreeSet<String>,
) -> Result<(RecordSet, LoadReport), SyncError> {
    let table = read_required(&*store, config, name)?;
    RecordSet::from_table(name, &table, leaders, Dedup::KeepFirst)
}

/// Write `table` unless the stored sheet already equals it
fn write_if_changed<S: SheetStore + ?Sized>(
    store: &mut S,
    name: &str,
    previous: Option<&Table>,
    table: &Table,
) -> Result<bool, SyncError> {
    if previous == Some(table) {
        return Ok(false);
    }
    store.replace_sheet(name, table)?;
    info!(sheet = name, rows = table.len(), "sheet written");
    Ok(true)
}

// ============================================================================
// Notes sync
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotesSyncReport {
    pub origin_records: usize,
    pub notes_records: usize,
    pub new_ids: Vec<TaskId>,
    pub orphan_ids: Vec<TaskId>,
    pub overwritten_ids: Vec<TaskId>,
    pub discrepancies: Vec<Discrepancy>,
    /// Leader score columns of the notes sheet
    pub leaders: Vec<String>,
    /// Distinct assignees of the notes sheet
    pub assignees: Vec<String>,
    /// Rows dropped for an empty ID, both sheets
    pub invalid_ids: usize,
    /// Repeated IDs dropped, both sheets
    pub duplicate_ids: Vec<TaskId>,
    /// Whether the notes sheet was rewritten (or created)
    pub written: bool,
}

/// Bring new and changed origin tasks into the notes sheet.
///
/// The notes sheet is created with the origin layout when absent.
pub fn sync_notes<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
) -> Result<NotesSyncReport, SyncError> {
    let sheets = &config.sheets;
    let leader_names = load_roster(&*store, config)?.leader_names();
    let (origin, origin_report) = load_set(&*store, config, &sheets.origin, &leader_names)?;

    let stored = read_optional(&*store, config, &sheets.notes)?;
    let (notes, notes_report) = match &stored {
        Some(table) => RecordSet::from_table(&sheets.notes, table, &leader_names, Dedup::KeepFirst)?,
        None => {
            warn!(sheet = %sheets.notes, "notes sheet not found, creating from origin layout");
            let mut empty = RecordSet::empty(&sheets.notes, origin.columns.clone());
            empty.leaders = origin.leaders.clone();
            (empty, LoadReport::default())
        }
    };

    let result = reconcile(&origin, &notes);
    let written = if result.needs_write() || stored.is_none() {
        write_if_changed(store, &sheets.notes, stored.as_ref(), &result.merged.to_table())?
    } else {
        false
    };

    let mut duplicate_ids = origin_report.duplicates;
    duplicate_ids.extend(notes_report.duplicates);

    Ok(NotesSyncReport {
        origin_records: origin.len(),
        notes_records: result.merged.len(),
        leaders: result.merged.leaders.iter().cloned().collect(),
        assignees: result.merged.assignees(),
        new_ids: result.new_ids,
        orphan_ids: result.orphan_ids,
        overwritten_ids: result.overwritten_ids,
        discrepancies: result.discrepancies,
        invalid_ids: origin_report.invalid_ids + notes_report.invalid_ids,
        duplicate_ids,
        written,
    })
}

/// Notes assignees matching a roster status filter
pub fn assignees<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    filter: StatusFilter,
) -> Result<Vec<String>, SyncError> {
    let roster = load_roster(&*store, config)?;
    let (notes, _) = load_set(&*store, config, &config.sheets.notes, &roster.leader_names())?;
    Ok(roster.filter_assignees(&notes.assignees(), filter))
}

// ============================================================================
// Month buckets
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BucketSyncReport {
    pub bucket: String,
    /// Records now in the bucket
    pub records: usize,
    /// Records before the sync (`None` when the sheet was created)
    pub previous: Option<usize>,
    pub written: bool,
}

/// Replace a month sheet with the origin records classified into it
pub fn sync_month<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    bucket: MonthBucket,
    today: NaiveDate,
) -> Result<BucketSyncReport, SyncError> {
    let leaders = load_roster(&*store, config)?.leader_names();
    let (origin, _) = load_set(&*store, config, &config.sheets.origin, &leaders)?;
    let selected = monthly::select_for_month(&origin, bucket, today);
    replace_bucket(store, config, &bucket.name(), &selected)
}

/// Replace the backlog sheet with undated origin records
pub fn sync_backlog<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
) -> Result<BucketSyncReport, SyncError> {
    let leaders = load_roster(&*store, config)?.leader_names();
    let (origin, _) = load_set(&*store, config, &config.sheets.origin, &leaders)?;
    let selected = monthly::select_backlog(&origin, &config.sheets.backlog);
    replace_bucket(store, config, &config.sheets.backlog, &selected)
}

fn replace_bucket<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    name: &str,
    selected: &RecordSet,
) -> Result<BucketSyncReport, SyncError> {
    let stored = read_optional(&*store, config, name)?;
    if stored.is_none() {
        info!(sheet = name, "creating bucket");
    }
    let table = selected.to_table();
    let written = write_if_changed(store, name, stored.as_ref(), &table)?;
    Ok(BucketSyncReport {
        bucket: name.to_string(),
        records: table.len(),
        previous: stored.map(|t| t.len()),
        written,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub bucket: String,
    pub bucket_found: bool,
    pub audit: MonthAudit,
    /// Origin tasks the month sheet does not hold
    pub missing: Vec<MissingTask>,
}

/// Check a month sheet against its month and against origin
pub fn audit_month<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    bucket: MonthBucket,
    today: NaiveDate,
) -> Result<AuditReport, SyncError> {
    let leaders = load_roster(&*store, config)?.leader_names();
    let (origin, _) = load_set(&*store, config, &config.sheets.origin, &leaders)?;
    let name = bucket.name();

    let (month, found) = match read_optional(&*store, config, &name)? {
        Some(table) => (RecordSet::from_table(&name, &table, &leaders, Dedup::KeepFirst)?.0, true),
        None => {
            warn!(sheet = %name, "month sheet not found, auditing as empty");
            (RecordSet::empty(&name, origin.columns.clone()), false)
        }
    };

    Ok(AuditReport {
        bucket: name,
        bucket_found: found,
        audit: monthly::audit_month(&month, bucket, today),
        missing: monthly::missing_from(&origin, &month, Some(bucket), today),
    })
}

// ============================================================================
// History and consolidation
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum HistoryOutcome {
    Recorded {
        week_start: NaiveDate,
        counters: Counters,
        upsert: Upsert,
    },
    SkippedWeekend {
        weekday: Weekday,
    },
    SkippedMissingSource {
        bucket: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    pub as_of: NaiveDate,
    pub outcome: HistoryOutcome,
    pub written: bool,
}

/// Count the week of `as_of` and record it in the history sheet.
///
/// Weekends are skipped before anything is read.
pub fn record_history<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> Result<HistoryReport, SyncError> {
    let skipped = |outcome| HistoryReport {
        as_of,
        outcome,
        written: false,
    };

    if !is_business_day(as_of) {
        info!(%as_of, weekday = ?as_of.weekday(), "weekend, history not recorded");
        return Ok(skipped(HistoryOutcome::SkippedWeekend {
            weekday: as_of.weekday(),
        }));
    }

    let source = config.history_source();
    let (week_start, counters) = {
        let Some(table) = read_optional(&*store, config, source)? else {
            warn!(sheet = source, "history source not found, skipping");
            return Ok(skipped(HistoryOutcome::SkippedMissingSource {
                bucket: source.to_string(),
            }));
        };
        let (records, _) =
            RecordSet::from_table(source, &table, &BTreeSet::new(), Dedup::KeepFirst)?;
        match snapshot::aggregate(&records.records, as_of) {
            Aggregate::Skipped { weekday, .. } => {
                return Ok(skipped(HistoryOutcome::SkippedWeekend { weekday }));
            }
            Aggregate::Counted {
                week_start,
                counters,
                ..
            } => (week_start, counters),
        }
    };

    let name = &config.sheets.history;
    let stored = read_optional(&*store, config, name)?;
    let mut history = match &stored {
        Some(table) => History::from_table(name, table)?,
        None => History::default(),
    };
    let upsert = history.upsert(as_of, counters);
    let written = if upsert == Upsert::Unchanged && stored.is_some() {
        false
    } else {
        write_if_changed(store, name, stored.as_ref(), &history.to_table())?
    };

    Ok(HistoryReport {
        as_of,
        outcome: HistoryOutcome::Recorded {
            week_start,
            counters,
            upsert,
        },
        written,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsolidateReport {
    /// Source sheets stacked, with their row counts
    pub stacked: Vec<(String, usize)>,
    /// Requested sheets that are not month sheets or do not exist
    pub skipped: Vec<String>,
    pub total_rows: usize,
    pub written: bool,
}

/// Stack month sheets into the consolidated sheet.
///
/// With no names given, every month sheet in the workbook is stacked.
/// Given names that are not month sheet names, the consolidated sheet
/// itself included, are skipped.
pub fn consolidate<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    buckets: &[String],
) -> Result<ConsolidateReport, SyncError> {
    let target = &config.sheets.consolidated;
    let mut skipped = Vec::new();
    let names: Vec<String> = if buckets.is_empty() {
        store
            .sheet_names()?
            .into_iter()
            .filter(|n| MonthBucket::parse(n).is_some())
            .collect()
    } else {
        let mut names = Vec::with_capacity(buckets.len());
        for name in buckets {
            if MonthBucket::parse(name).is_none() || name == target {
                warn!(sheet = %name, "not a month sheet, skipping");
                skipped.push(name.clone());
            } else {
                names.push(name.clone());
            }
        }
        names
    };

    let mut sources = Vec::new();
    let mut stacked = Vec::new();
    for name in names {
        match read_optional(&*store, config, &name)? {
            Some(table) => {
                stacked.push((name.clone(), table.len()));
                sources.push((name, table));
            }
            None => {
                warn!(sheet = %name, "snapshot source not found, skipping");
                skipped.push(name);
            }
        }
    }

    let stored = read_optional(&*store, config, target)?;
    let table = snapshot::stack_snapshots(stored.as_ref().unwrap_or(&Table::default()), &sources);
    let written = write_if_changed(store, target, stored.as_ref(), &table)?;

    Ok(ConsolidateReport {
        stacked,
        skipped,
        total_rows: table.len(),
        written,
    })
}

// ============================================================================
// Editor operations
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditReport {
    pub outcome: EditOutcome,
    pub written: bool,
}

/// Apply editor changes to the notes sheet
pub fn save_edits<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    edits: &[RecordEdit],
) -> Result<EditReport, SyncError> {
    let leaders = load_roster(&*store, config)?.leader_names();
    let (mut notes, _) = load_set(&*store, config, &config.sheets.notes, &leaders)?;
    let outcome = edit::apply_edits(&mut notes, edits);
    let written = if outcome.is_changed() {
        store.replace_sheet(&config.sheets.notes, &notes.to_table())?;
        true
    } else {
        false
    };
    Ok(EditReport { outcome, written })
}

/// Fix a misspelled assignee across the notes sheet
pub fn correct_assignee<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    wrong: &str,
    right: &str,
) -> Result<usize, SyncError> {
    let leaders = load_roster(&*store, config)?.leader_names();
    let (mut notes, _) = load_set(&*store, config, &config.sheets.notes, &leaders)?;
    let count = edit::rename_assignee(&mut notes, wrong, right);
    if count > 0 {
        store.replace_sheet(&config.sheets.notes, &notes.to_table())?;
    }
    Ok(count)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromoteReport {
    pub name: String,
    pub column_added: bool,
    pub roster_updated: bool,
}

/// Make `name` a leader: add the score column and flag the roster row.
///
/// The roster is checked before anything is written.
pub fn promote_leader<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    name: &str,
) -> Result<PromoteReport, SyncError> {
    let sheets = &config.sheets;
    let roster_table = read_required(&*store, config, &sheets.roster)?;
    let mut roster = Roster::from_table(roster_table);
    let roster_updated = roster.promote(name)?;

    let (mut notes, _) = load_set(&*store, config, &sheets.notes, &roster.leader_names())?;
    let column_added = notes.add_leader_column(name.trim());

    if column_added {
        store.replace_sheet(&sheets.notes, &notes.to_table())?;
    }
    if roster_updated {
        store.replace_sheet(&sheets.roster, roster.table())?;
    }
    info!(name, column_added, roster_updated, "promoted leader");

    Ok(PromoteReport {
        name: name.trim().to_string(),
        column_added,
        roster_updated,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub id: TaskId,
    /// Sheets touched, with the rows removed from each
    pub removed: Vec<(String, usize)>,
}

/// Delete a task from origin and from the given month sheet
pub fn delete_task<S: SheetStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    id: &str,
    month: MonthBucket,
) -> Result<DeleteReport, SyncError> {
    let targets = [config.sheets.origin.clone(), month.name()];
    let mut pending = Vec::new();

    for name in &targets {
        let Some(mut table) = read_optional(&*store, config, name)? else {
            warn!(sheet = %name, "sheet not found, nothing to delete there");
            continue;
        };
        let count = edit::remove_rows_by_id(&mut table, id);
        if count > 0 {
            pending.push((name.clone(), table, count));
        }
    }

    if pending.is_empty() {
        return Err(SyncError::UnknownTask {
            id: id.to_string(),
            buckets: targets.join(", "),
        });
    }

    let mut removed = Vec::new();
    for (name, table, count) in pending {
        store.replace_sheet(&name, &table)?;
        info!(sheet = %name, id, count, "deleted task");
        removed.push((name, count));
    }
    Ok(DeleteReport {
        id: id.to_string(),
        removed,
    })
}

/// Scoreboard over the notes sheet
pub fn report<S: SheetStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
) -> Result<Scoreboard, SyncError> {
    let roster = load_roster(&*store, config)?;
    let (notes, _) = load_set(&*store, config, &config.sheets.notes, &roster.leader_names())?;
    Ok(scoreboard::scoreboard(&notes, &roster, config.week_anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tasksync_core::MemoryStore;

    use crate::reconcile::DiscrepancyField;

    const HEADER: [&str; 6] = ["Link", "Tarefa", "Encarregado", "Peso", "Data Final", "Lista"];

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> Table {
        let mut values = vec![header.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        values.extend(rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()));
        Table::from_values(values)
    }

    fn origin() -> Table {
        table(
            &HEADER,
            &[
                &["https://bc/todos/1", "Relatório", "Ana", "3", "15/10/2025", "Sprint 13/10/2025"],
                &["https://bc/todos/2", "Deploy", "Bruno", "", "", "Sprint 13/10/2025"],
                &["https://bc/todos/3", "Velho", "Ana", "1", "02/09/2025", "Sprint [ARCHIVED]"],
            ],
        )
    }

    fn store() -> (MemoryStore, EngineConfig) {
        let config = EngineConfig::default();
        let store = MemoryStore::new().with_sheet(&config.sheets.origin, origin());
        (store, config)
    }

    #[test]
    fn notes_created_then_stable() {
        let (mut store, config) = store();
        let first = sync_notes(&mut store, &config).unwrap();
        assert_eq!(first.new_ids, vec!["1", "2"]);
        assert!(first.written);
        assert_eq!(store.sheet(&config.sheets.notes).unwrap().len(), 2);

        let second = sync_notes(&mut store, &config).unwrap();
        assert!(second.new_ids.is_empty());
        assert!(!second.written);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn editor_fields_are_flagged_not_overwritten() {
        let (mut store, config) = store();
        store.insert(
            &config.sheets.notes,
            table(
                &HEADER,
                &[&["https://bc/todos/1", "Rascunho", "Ana", "5", "15/10/2025", "Sprint 13/10/2025"]],
            ),
        );

        let report = sync_notes(&mut store, &config).unwrap();
        assert_eq!(report.overwritten_ids, vec!["1"]);
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].field, DiscrepancyField::Weight);

        let notes = store.sheet(&config.sheets.notes).unwrap();
        assert_eq!(notes.cell(0, "Tarefa"), "Relatório");
        assert_eq!(notes.cell(0, "Peso"), "5");
    }

    #[test]
    fn leader_columns_come_from_roster() {
        let (mut store, config) = store();
        store.insert(
            &config.sheets.roster,
            table(&["Nome", "Posição", "Status"], &[&["Pablo", "Lider", "Ativo"]]),
        );
        let mut header = HEADER.to_vec();
        header.push("Pablo");
        store.insert(&config.sheets.notes, table(&header, &[]));

        let report = sync_notes(&mut store, &config).unwrap();
        assert_eq!(report.leaders, vec!["Pablo"]);
        let notes = store.sheet(&config.sheets.notes).unwrap();
        assert_eq!(notes.cell(0, "Pablo"), "");
    }

    #[test]
    fn missing_field_aborts_without_writing() {
        let config = EngineConfig::default();
        let mut store = MemoryStore::new().with_sheet(
            &config.sheets.origin,
            table(&["Link", "Lista"], &[&["https://bc/todos/1", ""]]),
        );
        let err = sync_notes(&mut store, &config).unwrap_err();
        assert!(matches!(err, SyncError::MissingField { ref field, .. } if field == "Data Final"));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn missing_origin_is_reported() {
        let config = EngineConfig::default();
        let mut store = MemoryStore::new();
        let err = sync_notes(&mut store, &config).unwrap_err();
        assert!(matches!(err, SyncError::BucketNotFound(ref name) if name == "Total BaseCamp"));
    }

    #[test]
    fn transient_reads_are_retried() {
        let (mut store, mut config) = store();
        config.read_backoff_ms = 1;
        store.fail_next_reads(2);
        assert!(sync_notes(&mut store, &config).unwrap().written);

        store.fail_next_reads(3);
        let err = sync_notes(&mut store, &config).unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
    }

    #[test]
    fn month_sheet_created_on_demand() {
        let (mut store, config) = store();
        let october = MonthBucket::new(2025, 10).unwrap();
        let today = ymd(2025, 10, 20);

        let report = sync_month(&mut store, &config, october, today).unwrap();
        assert_eq!(report.bucket, "Outubro 2025");
        assert_eq!(report.previous, None);
        assert_eq!(report.records, 2);
        assert!(report.written);

        let again = sync_month(&mut store, &config, october, today).unwrap();
        assert_eq!(again.previous, Some(2));
        assert!(!again.written);
    }

    #[test]
    fn closed_month_drops_undated() {
        let (mut store, config) = store();
        let october = MonthBucket::new(2025, 10).unwrap();
        let report = sync_month(&mut store, &config, october, ymd(2025, 11, 3)).unwrap();
        assert_eq!(report.records, 1);

        let backlog = sync_backlog(&mut store, &config).unwrap();
        assert_eq!(backlog.bucket, "Backlog");
        assert_eq!(backlog.records, 1);
    }

    #[test]
    fn history_skips_weekends_without_io() {
        let (mut store, config) = store();
        store.fail_next_reads(10);
        let report = record_history(&mut store, &config, ymd(2025, 10, 18)).unwrap();
        assert_eq!(
            report.outcome,
            HistoryOutcome::SkippedWeekend { weekday: Weekday::Sat }
        );
        assert!(!report.written);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn history_upserts_by_day() {
        let (mut store, config) = store();
        let wednesday = ymd(2025, 10, 15);

        let first = record_history(&mut store, &config, wednesday).unwrap();
        assert_eq!(
            first.outcome,
            HistoryOutcome::Recorded {
                week_start: ymd(2025, 10, 13),
                counters: Counters { total: 2, closed: 1 },
                upsert: Upsert::Inserted,
            }
        );
        assert!(first.written);

        let second = record_history(&mut store, &config, wednesday).unwrap();
        assert!(!second.written);

        let history = store.sheet(&config.sheets.history).unwrap();
        assert_eq!(history.headers, vec!["Data", "Total_Fechadas", "Total_Tarefas"]);
        assert_eq!(history.rows, vec![vec!["15/10/2025", "1", "2"]]);
    }

    #[test]
    fn consolidation_stacks_month_sheets() {
        let (mut store, config) = store();
        sync_month(&mut store, &config, MonthBucket::new(2025, 10).unwrap(), ymd(2025, 10, 20)).unwrap();
        sync_month(&mut store, &config, MonthBucket::new(2025, 9).unwrap(), ymd(2025, 10, 20)).unwrap();

        let report = consolidate(&mut store, &config, &[]).unwrap();
        assert_eq!(
            report.stacked,
            vec![("Outubro 2025".to_string(), 2), ("Setembro 2025".to_string(), 0)]
        );
        assert_eq!(report.total_rows, 2);
        assert!(report.written);

        let again = consolidate(&mut store, &config, &["Outubro 2025".into(), "Maio 2020".into()]).unwrap();
        assert_eq!(again.skipped, vec!["Maio 2020"]);
        assert_eq!(again.total_rows, 2);
        assert!(!again.written);
    }

    #[test]
    fn consolidated_sheet_is_never_its_own_source() {
        let (mut store, config) = store();
        sync_month(&mut store, &config, MonthBucket::new(2025, 10).unwrap(), ymd(2025, 10, 20)).unwrap();
        consolidate(&mut store, &config, &[]).unwrap();

        let requested = vec![config.sheets.consolidated.clone(), config.sheets.origin.clone()];
        for _ in 0..3 {
            let report = consolidate(&mut store, &config, &requested).unwrap();
            assert!(report.stacked.is_empty());
            assert_eq!(report.skipped, requested);
            assert_eq!(report.total_rows, 2);
            assert!(!report.written);
        }
        assert_eq!(store.sheet(&config.sheets.consolidated).unwrap().len(), 2);
    }

    #[test]
    fn edits_and_renames_persist() {
        let (mut store, config) = store();
        sync_notes(&mut store, &config).unwrap();

        let report = save_edits(
            &mut store,
            &config,
            &[RecordEdit::new("2").weight(Some(dec!(8)))],
        )
        .unwrap();
        assert!(report.written);
        assert_eq!(store.sheet(&config.sheets.notes).unwrap().cell(1, "Peso"), "8");

        assert_eq!(correct_assignee(&mut store, &config, "Bruno", "Bruna").unwrap(), 1);
        assert_eq!(correct_assignee(&mut store, &config, "Bruno", "Bruna").unwrap(), 0);
        let notes = assignees(&store, &config, StatusFilter::All).unwrap();
        assert_eq!(notes, vec!["Ana", "Bruna"]);
    }

    #[test]
    fn promotion_checks_roster_first() {
        let (mut store, config) = store();
        sync_notes(&mut store, &config).unwrap();
        store.insert(
            &config.sheets.roster,
            table(&["Nome", "Posição", "Status"], &[&["Ana", "", "Ativo"]]),
        );
        let writes = store.write_count();

        let err = promote_leader(&mut store, &config, "Carla").unwrap_err();
        assert!(matches!(err, SyncError::NotInRoster(_)));
        assert_eq!(store.write_count(), writes);

        let report = promote_leader(&mut store, &config, "Ana").unwrap();
        assert!(report.column_added && report.roster_updated);
        let roster = store.sheet(&config.sheets.roster).unwrap();
        assert_eq!(roster.cell(0, "Posição"), "Lider");
        assert!(store.sheet(&config.sheets.notes).unwrap().has_column("Ana"));

        let again = promote_leader(&mut store, &config, "Ana").unwrap();
        assert!(!again.column_added && !again.roster_updated);
    }

    #[test]
    fn delete_removes_from_origin_and_month() {
        let (mut store, config) = store();
        let october = MonthBucket::new(2025, 10).unwrap();
        sync_month(&mut store, &config, october, ymd(2025, 10, 20)).unwrap();

        let report = delete_task(&mut store, &config, "1", october).unwrap();
        assert_eq!(
            report.removed,
            vec![("Total BaseCamp".to_string(), 1), ("Outubro 2025".to_string(), 1)]
        );

        let err = delete_task(&mut store, &config, "1", october).unwrap_err();
        assert!(matches!(err, SyncError::UnknownTask { ref id, .. } if id == "1"));
    }

    #[test]
    fn audit_of_missing_month_is_empty() {
        let (store, config) = store();
        let report = audit_month(&store, &config, MonthBucket::new(2025, 10).unwrap(), ymd(2025, 10, 20)).unwrap();
        assert!(!report.bucket_found);
        assert!(report.audit.accepted.is_empty());
        let lost: Vec<_> = report.missing.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(lost, vec!["1", "2", "3"]);
    }

    #[test]
    fn scoreboard_reads_notes() {
        let (mut store, config) = store();
        sync_notes(&mut store, &config).unwrap();
        let board = report(&store, &config).unwrap();
        let totals: Vec<_> = board.totals.iter().map(|t| (t.assignee.as_str(), t.total)).collect();
        assert_eq!(totals, vec![("Ana", dec!(3)), ("Bruno", dec!(0))]);
    }
}
