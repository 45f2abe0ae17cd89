//! End-to-end behavior of the engine over an in-memory workbook.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tasksync_core::bucket::{classify, Membership, MonthBucket};
use tasksync_core::dates::normalize;
use tasksync_core::{identity, DateValue, Dedup, MemoryStore, RecordSet, Table};
use tasksync_engine::pipeline::{self, HistoryOutcome};
use tasksync_engine::snapshot::Upsert;
use tasksync_engine::{aggregate, reconcile, Aggregate, EngineConfig};

const HEADER: [&str; 6] = ["Link", "Tarefa", "Encarregado", "Peso", "Data Final", "Lista"];

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn table(rows: &[[&str; 6]]) -> Table {
    let mut values = vec![HEADER.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
    values.extend(rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()));
    Table::from_values(values)
}

fn load(rows: &[[&str; 6]]) -> RecordSet {
    RecordSet::from_table("sheet", &table(rows), &BTreeSet::new(), Dedup::KeepFirst)
        .unwrap()
        .0
}

#[test]
fn identity_is_last_link_segment() {
    assert_eq!(identity::resolve("https://bc/p/1/todos/abc123").as_deref(), Some("abc123"));
    assert_eq!(identity::resolve("  https://bc/todos/abc123  ").as_deref(), Some("abc123"));
    assert_eq!(identity::resolve(""), None);
}

#[test]
fn day_first_wins_then_iso() {
    let march = DateValue::Known(ymd(2025, 3, 15));
    assert_eq!(normalize("15/03/2025"), march);
    assert_eq!(normalize("2025-03-15"), march);
    for blank in ["", "nan", "NaT"] {
        assert_eq!(normalize(blank), DateValue::Unknown, "{blank:?}");
    }
}

#[test]
fn reconcile_twice_is_stable() {
    let origin = load(&[
        ["l/1", "A", "Ana", "1", "", ""],
        ["l/2", "B", "Bia", "2", "03/11/2025", ""],
    ]);
    let destination = load(&[["l/1", "old", "Ana", "1", "", ""]]);

    let first = reconcile(&origin, &destination);
    let second = reconcile(&origin, &first.merged);
    assert_eq!(second.merged, first.merged);
    assert!(second.new_ids.is_empty());
    assert!(!second.needs_write());
}

#[test]
fn partitions_cover_each_id_once() {
    let origin = load(&[
        ["l/1", "", "", "", "", ""],
        ["l/2", "", "", "", "", ""],
        ["l/2", "", "", "", "", ""],
        ["l/4", "", "", "", "", "Sprint B"],
        ["l/5", "", "", "", "", "Sprint B [ARCHIVED]"],
    ]);
    let destination = load(&[
        ["l/2", "", "", "", "", ""],
        ["l/3", "", "", "", "", ""],
        ["l/4", "", "", "", "", "Sprint A [ARCHIVED]"],
        ["l/5", "", "", "", "", "Sprint B"],
    ]);
    let result = reconcile(&origin, &destination);

    let mut all: Vec<_> = result
        .new_ids
        .iter()
        .chain(&result.orphan_ids)
        .chain(&result.common_ids)
        .cloned()
        .collect();
    all.sort();
    assert_eq!(all, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(result.common_ids, vec!["2", "4"]);
    assert_eq!(result.orphan_ids, vec!["3", "5"]);
    assert!(result.archived_ids.is_empty());

    let merged: Vec<_> = result.merged.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(merged, vec!["2", "3", "4", "5", "1"]);
    assert_eq!(result.merged.get("4").unwrap().list, "Sprint B");
}

#[test]
fn weight_compared_numerically() {
    let origin = load(&[["l/1", "", "Ana", "5", "", ""]]);
    assert!(reconcile(&origin, &load(&[["l/1", "", "Ana", "5.0", "", ""]]))
        .discrepancies
        .is_empty());
    assert_eq!(
        reconcile(&origin, &load(&[["l/1", "", "Ana", "6", "", ""]]))
            .discrepancies
            .len(),
        1
    );
}

#[test]
fn undated_belongs_only_to_open_months() {
    let set = load(&[["l/1", "", "", "", "", ""]]);
    let today = ymd(2025, 11, 20);
    let record = &set.records[0];
    assert_eq!(classify(record, MonthBucket::new(2025, 11).unwrap(), today), Membership::Belongs);
    assert_eq!(classify(record, MonthBucket::new(2025, 10).unwrap(), today), Membership::Excluded);
}

#[test]
fn history_upsert_keeps_one_row_per_day() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new().with_sheet(
        &config.sheets.origin,
        table(&[["l/1", "", "", "", "14/10/2025", "Semana 13/10/2025"]]),
    );
    let tuesday = ymd(2025, 10, 14);

    pipeline::record_history(&mut store, &config, tuesday).unwrap();
    let again = pipeline::record_history(&mut store, &config, tuesday).unwrap();
    assert!(matches!(
        again.outcome,
        HistoryOutcome::Recorded { upsert: Upsert::Unchanged, .. }
    ));

    let history = store.sheet(&config.sheets.history).unwrap();
    assert_eq!(history.rows, vec![vec!["14/10/2025", "1", "1"]]);
}

#[test]
fn archived_records_are_invisible() {
    let archived = ["l/9", "", "Ana", "100", "14/10/2025", "Sprint A [ARCHIVED] 13/10/2025"];
    let origin = load(&[archived]);
    let today = ymd(2025, 10, 20);

    assert_eq!(
        classify(&origin.records[0], MonthBucket::new(2025, 10).unwrap(), today),
        Membership::Excluded
    );

    let result = reconcile(&origin, &load(&[]));
    assert!(result.new_ids.is_empty() && result.common_ids.is_empty());
    assert!(result.merged.is_empty());

    match aggregate(&origin.records, ymd(2025, 10, 14)) {
        Aggregate::Counted { counters, .. } => assert_eq!(counters.total, 0),
        other => panic!("expected counts, got {other:?}"),
    }
}

#[test]
fn saturday_leaves_history_alone() {
    let config = EngineConfig::default();
    let history = Table::from_values(vec![
        vec!["Data".into(), "Total_Fechadas".into(), "Total_Tarefas".into()],
        vec!["17/10/2025".into(), "3".into(), "4".into()],
    ]);
    let mut store = MemoryStore::new()
        .with_sheet(&config.sheets.origin, table(&[]))
        .with_sheet(&config.sheets.history, history.clone());

    let report = pipeline::record_history(&mut store, &config, ymd(2025, 10, 18)).unwrap();
    assert!(matches!(report.outcome, HistoryOutcome::SkippedWeekend { .. }));
    assert_eq!(store.sheet(&config.sheets.history), Some(&history));
    assert_eq!(store.write_count(), 0);
}
