//! Report rendering for CLI output
//!
//! Every command prints one report to stdout, either as plain text or as
//! JSON (`--format json`). Logs go to stderr so JSON output stays clean.
//!
//! ## Exit Code Semantics
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success |
//! | 1 | Failure: an error, unknown IDs in an edit, or discrepancies under `--strict` |

use std::process;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use tasksync_core::numeric;
use tasksync_engine::edit::EditOutcome;
use tasksync_engine::pipeline::{
    AuditReport, BucketSyncReport, ConsolidateReport, DeleteReport, EditReport, HistoryOutcome,
    HistoryReport, NotesSyncReport, PromoteReport,
};
use tasksync_engine::scoreboard::{Scoreboard, WeeklyRow};

// ============================================================================
// Exit Code
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    /// Failure when anything went wrong
    pub fn from_failures(count: usize) -> Self {
        if count > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

// ============================================================================
// Format
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Plain-text rendering of a report
pub trait Render {
    fn render(&self) -> String;
}

/// Print a report to stdout in the chosen format
pub fn emit<T: Serialize + Render>(format: Format, report: &T) -> Result<()> {
    match format {
        Format::Text => print!("{}", report.render()),
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn list(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

// ============================================================================
// Reports
// ============================================================================

impl Render for NotesSyncReport {
    fn render(&self) -> String {
        let mut out = format!(
            "notes: {} records (origin {})\n",
            self.notes_records, self.origin_records
        );
        out.push_str(&format!("new: {}\n", list(&self.new_ids)));
        out.push_str(&format!("orphans: {}\n", list(&self.orphan_ids)));
        out.push_str(&format!("overwritten: {}\n", list(&self.overwritten_ids)));
        if self.invalid_ids > 0 || !self.duplicate_ids.is_empty() {
            out.push_str(&format!(
                "dropped: {} without ID, duplicates {}\n",
                self.invalid_ids,
                list(&self.duplicate_ids)
            ));
        }
        if self.discrepancies.is_empty() {
            out.push_str("discrepancies: -\n");
        } else {
            out.push_str("discrepancies:\n");
            for d in &self.discrepancies {
                out.push_str(&format!(
                    "  {} {}: origin '{}' / notes '{}'\n",
                    d.id, d.field, d.origin, d.destination
                ));
            }
        }
        out.push_str(&format!("leaders: {}\n", list(&self.leaders)));
        out.push_str(&format!("written: {}\n", yes_no(self.written)));
        out
    }
}

impl Render for BucketSyncReport {
    fn render(&self) -> String {
        let previous = self
            .previous
            .map_or_else(|| "created".to_string(), |n| format!("was {n}"));
        format!(
            "{}: {} records ({}), written: {}\n",
            self.bucket,
            self.records,
            previous,
            yes_no(self.written)
        )
    }
}

impl Render for HistoryReport {
    fn render(&self) -> String {
        match &self.outcome {
            HistoryOutcome::Recorded {
                week_start,
                counters,
                upsert,
            } => format!(
                "{}: week of {}, {} closed of {} ({:?}), written: {}\n",
                self.as_of,
                week_start,
                counters.closed,
                counters.total,
                upsert,
                yes_no(self.written)
            ),
            HistoryOutcome::SkippedWeekend { weekday } => {
                format!("{}: skipped, {} is not a business day\n", self.as_of, weekday)
            }
            HistoryOutcome::SkippedMissingSource { bucket } => {
                format!("{}: skipped, sheet '{}' not found\n", self.as_of, bucket)
            }
        }
    }
}

impl Render for ConsolidateReport {
    fn render(&self) -> String {
        let mut out = String::new();
        for (name, rows) in &self.stacked {
            out.push_str(&format!("stacked {name}: {rows} rows\n"));
        }
        for name in &self.skipped {
            out.push_str(&format!("skipped {name}\n"));
        }
        out.push_str(&format!(
            "consolidated: {} rows, written: {}\n",
            self.total_rows,
            yes_no(self.written)
        ));
        out
    }
}

impl Render for AuditReport {
    fn render(&self) -> String {
        let mut out = self.bucket.clone();
        if !self.bucket_found {
            out.push_str(" (sheet not found)");
        }
        out.push('\n');
        let audit = &self.audit;
        out.push_str(&format!("accepted: {}\n", audit.accepted.len()));
        for (id, date) in &audit.dated_elsewhere {
            out.push_str(&format!("  dated elsewhere: {} ({})\n", id, date.format("%d/%m/%Y")));
        }
        for id in &audit.undated {
            out.push_str(&format!("  undated in closed month: {id}\n"));
        }
        for id in &audit.archived {
            out.push_str(&format!("  archived: {id}\n"));
        }
        out.push_str(&format!("missing from sheet: {}\n", self.missing.len()));
        for task in &self.missing {
            out.push_str(&format!(
                "  {} [{}] {} {:?}\n",
                task.id,
                if task.end.is_empty() { "-" } else { task.end.as_str() },
                task.assignee,
                task.reason
            ));
        }
        out
    }
}

impl Render for EditOutcome {
    fn render(&self) -> String {
        let mut out = format!("changed: {}\n", list(&self.changed));
        if !self.unknown.is_empty() {
            out.push_str(&format!("unknown IDs: {}\n", list(&self.unknown)));
        }
        if !self.rejected_columns.is_empty() {
            out.push_str(&format!(
                "ignored non-leader columns: {}\n",
                list(&self.rejected_columns)
            ));
        }
        out
    }
}

impl Render for EditReport {
    fn render(&self) -> String {
        let mut out = self.outcome.render();
        out.push_str(&format!("written: {}\n", yes_no(self.written)));
        out
    }
}

impl Render for PromoteReport {
    fn render(&self) -> String {
        format!(
            "{}: leader column {}, roster {}\n",
            self.name,
            if self.column_added { "added" } else { "present" },
            if self.roster_updated { "updated" } else { "unchanged" }
        )
    }
}

impl Render for DeleteReport {
    fn render(&self) -> String {
        let mut out = String::new();
        for (sheet, count) in &self.removed {
            out.push_str(&format!("removed {} from {}: {} rows\n", self.id, sheet, count));
        }
        out
    }
}

/// Result of an assignee rename
#[derive(Debug, Serialize)]
pub struct Renamed {
    pub from: String,
    pub to: String,
    pub records: usize,
}

impl Render for Renamed {
    fn render(&self) -> String {
        format!("{} -> {}: {} records\n", self.from, self.to, self.records)
    }
}

/// Filtered assignee names
#[derive(Debug, Serialize)]
pub struct Assignees {
    pub assignees: Vec<String>,
}

impl Render for Assignees {
    fn render(&self) -> String {
        self.assignees.iter().map(|a| format!("{a}\n")).collect()
    }
}

fn weekly_table(out: &mut String, title: &str, weeks: &[String], rows: &[WeeklyRow]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}\n{:<20}", ""));
    for week in weeks {
        out.push_str(&format!(" {week:>10}"));
    }
    out.push('\n');
    for row in rows {
        out.push_str(&format!("{:<20}", row.assignee));
        for value in &row.values {
            out.push_str(&format!(" {:>10}", numeric::format(*value)));
        }
        out.push('\n');
    }
}

impl Render for Scoreboard {
    fn render(&self) -> String {
        let mut out = format!("{:<20} {:>8} {:>8} {:>8}\n", "assignee", "weight", "leader", "total");
        for score in &self.totals {
            out.push_str(&format!(
                "{:<20} {:>8} {:>8} {:>8}\n",
                score.assignee,
                numeric::format(score.weight),
                numeric::format(score.leader_points),
                numeric::format(score.total)
            ));
        }
        if !self.leaders.is_empty() {
            out.push_str("\nleader points\n");
            for leader in &self.leaders {
                out.push_str(&format!(
                    "{:<20} {:>8}\n",
                    leader.leader,
                    numeric::format(leader.points)
                ));
            }
        }
        weekly_table(&mut out, "weekly weight", &self.weeks, &self.weekly_weight);
        weekly_table(&mut out, "weekly leader points", &self.weeks, &self.weekly_leader_points);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exit_codes() {
        assert_eq!(ExitCode::from_failures(0), ExitCode::Success);
        assert_eq!(ExitCode::from_failures(2), ExitCode::Failure);
    }

    #[test]
    fn bucket_report_text() {
        let report = BucketSyncReport {
            bucket: "Outubro 2025".into(),
            records: 3,
            previous: None,
            written: true,
        };
        assert_eq!(report.render(), "Outubro 2025: 3 records (created), written: yes\n");
    }

    #[test]
    fn rename_text() {
        let renamed = Renamed {
            from: "Anna".into(),
            to: "Ana".into(),
            records: 2,
        };
        assert_eq!(renamed.render(), "Anna -> Ana: 2 records\n");
    }
}
