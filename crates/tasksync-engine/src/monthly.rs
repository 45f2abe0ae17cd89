//! Month bucket and backlog selection, and audits of bucket contents.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use tasksync_core::bucket::{classify, Membership, MonthBucket};
use tasksync_core::{archive, RecordSet, TaskId, TaskRecord};

/// Records of `origin` that belong in `bucket`, in origin order and layout
pub fn select_for_month(origin: &RecordSet, bucket: MonthBucket, today: NaiveDate) -> RecordSet {
    let records: Vec<TaskRecord> = origin
        .records
        .iter()
        .filter(|r| classify(r, bucket, today) == Membership::Belongs)
        .cloned()
        .collect();
    debug!(bucket = %bucket, selected = records.len(), of = origin.len(), "month selection");
    RecordSet {
        bucket: bucket.name(),
        columns: origin.columns.clone(),
        leaders: origin.leaders.clone(),
        records,
    }
}

/// Active records of `origin` without a `Data Final`
pub fn select_backlog(origin: &RecordSet, bucket: &str) -> RecordSet {
    RecordSet {
        bucket: bucket.to_string(),
        columns: origin.columns.clone(),
        leaders: origin.leaders.clone(),
        records: archive::active(&origin.records)
            .filter(|r| r.end.is_unknown())
            .cloned()
            .collect(),
    }
}

// ============================================================================
// Audits
// ============================================================================

/// How the records of a month sheet relate to that month
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MonthAudit {
    pub bucket: String,
    /// Records the classifier accepts for the month
    pub accepted: Vec<TaskId>,
    /// Records dated in some other month
    pub dated_elsewhere: Vec<(TaskId, NaiveDate)>,
    /// Undated records in a closed month
    pub undated: Vec<TaskId>,
    pub archived: Vec<TaskId>,
}

impl MonthAudit {
    pub fn rejected(&self) -> usize {
        self.dated_elsewhere.len() + self.undated.len() + self.archived.len()
    }
}

/// Check every record of a month sheet against the month it claims to be
pub fn audit_month(records: &RecordSet, bucket: MonthBucket, today: NaiveDate) -> MonthAudit {
    let mut audit = MonthAudit {
        bucket: bucket.name(),
        ..MonthAudit::default()
    };
    for record in &records.records {
        if record.is_archived() {
            audit.archived.push(record.id.clone());
            continue;
        }
        match (classify(record, bucket, today), record.end.date()) {
            (Membership::Belongs, _) => audit.accepted.push(record.id.clone()),
            (Membership::Excluded, Some(date)) => {
                audit.dated_elsewhere.push((record.id.clone(), date));
            }
            (Membership::Excluded, None) => audit.undated.push(record.id.clone()),
        }
    }
    audit
}

/// Why an origin task is absent from a bucket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MissingReason {
    /// `Data Final` falls in another month
    DatedElsewhere,
    /// No `Data Final`, and the month is closed
    UndatedInClosedMonth,
    Archived,
    /// The classifier accepts it: the bucket has lost this task
    Lost,
}

/// An origin task that the target bucket does not hold
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingTask {
    pub id: TaskId,
    /// `Data Final` as written back (`DD/MM/YYYY`), blank when unknown
    pub end: String,
    pub assignee: String,
    pub reason: MissingReason,
}

/// Origin tasks absent from `target`, each with the reason it is absent.
///
/// Without a month, every absent active task counts as lost.
pub fn missing_from(
    origin: &RecordSet,
    target: &RecordSet,
    month: Option<MonthBucket>,
    today: NaiveDate,
) -> Vec<MissingTask> {
    let present = target.ids();
    origin
        .records
        .iter()
        .filter(|r| !present.contains(&r.id))
        .map(|r| {
            let reason = if r.is_archived() {
                MissingReason::Archived
            } else {
                match month {
                    None => MissingReason::Lost,
                    Some(bucket) => match (classify(r, bucket, today), r.end.date()) {
                        (Membership::Belongs, _) => MissingReason::Lost,
                        (Membership::Excluded, Some(_)) => MissingReason::DatedElsewhere,
                        (Membership::Excluded, None) => MissingReason::UndatedInClosedMonth,
                    },
                }
            };
            MissingTask {
                id: r.id.clone(),
                end: r.end.to_string(),
                assignee: r.assignee.clone(),
                reason,
            }
        })
        .collect()
}
