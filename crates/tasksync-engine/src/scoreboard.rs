//! Score summaries over the notes set.
//!
//! An assignee's score is the sum of the weights of their tasks plus the
//! leader points given in the column carrying their name. Weekly tables
//! bucket tasks by `Data Final` into 7-day weeks counted from a fixed
//! anchor date.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use tasksync_core::dates::format_day_first;
use tasksync_core::roster::Roster;
use tasksync_core::{archive, RecordSet, TaskRecord};

/// Totals for one assignee
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssigneeScore {
    pub assignee: String,
    /// Sum of `Peso` over the assignee's tasks
    pub weight: Decimal,
    /// Points in the leader column named after the assignee
    pub leader_points: Decimal,
    pub total: Decimal,
}

/// Sum of one leader column
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderPoints {
    pub leader: String,
    pub points: Decimal,
}

/// One assignee's values per week, aligned with [`Scoreboard::weeks`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeeklyRow {
    pub assignee: String,
    pub values: Vec<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub totals: Vec<AssigneeScore>,
    pub leaders: Vec<LeaderPoints>,
    /// Week labels (`DD/MM/YYYY` of the week's first day), oldest first
    pub weeks: Vec<String>,
    pub weekly_weight: Vec<WeeklyRow>,
    pub weekly_leader_points: Vec<WeeklyRow>,
}

/// First day of the anchored week containing `date`
pub fn anchored_week(date: NaiveDate, anchor: NaiveDate) -> NaiveDate {
    let offset = (date - anchor).num_days().div_euclid(7) * 7;
    anchor + Duration::days(offset)
}

/// Build the scoreboard.
///
/// Rows are limited to assignees with `Ativo` status in the roster; when
/// the roster is empty every assignee is shown.
pub fn scoreboard(notes: &RecordSet, roster: &Roster, anchor: NaiveDate) -> Scoreboard {
    let records: Vec<&TaskRecord> = archive::active(&notes.records).collect();
    let shown = visible_names(notes, roster);
    let visible = |name: &str| shown.contains(&name.to_lowercase());

    let mut weight_by_assignee: BTreeMap<String, Decimal> = BTreeMap::new();
    for record in &records {
        *weight_by_assignee.entry(record.assignee.clone()).or_default() +=
            record.weight.unwrap_or_default();
    }

    let mut points_by_leader: BTreeMap<String, Decimal> = BTreeMap::new();
    for leader in &notes.leaders {
        let points = records
            .iter()
            .filter_map(|r| r.scores.get(leader).copied().flatten())
            .sum();
        points_by_leader.insert(leader.clone(), points);
    }
    let points_lower: BTreeMap<String, Decimal> = points_by_leader
        .iter()
        .map(|(k, v)| (k.to_lowercase(), *v))
        .collect();

    let totals = weight_by_assignee
        .iter()
        .filter(|(name, _)| visible(name))
        .map(|(name, weight)| {
            let leader_points = points_lower
                .get(&name.to_lowercase())
                .copied()
                .unwrap_or_default();
            AssigneeScore {
                assignee: name.clone(),
                weight: *weight,
                leader_points,
                total: *weight + leader_points,
            }
        })
        .collect();

    let leaders = points_by_leader
        .into_iter()
        .filter(|(name, _)| visible(name))
        .map(|(leader, points)| LeaderPoints { leader, points })
        .collect();

    let dated: Vec<(&TaskRecord, NaiveDate)> = records
        .iter()
        .filter_map(|r| r.end.date().map(|d| (*r, anchored_week(d, anchor))))
        .collect();
    let week_starts: BTreeSet<NaiveDate> = dated.iter().map(|(_, w)| *w).collect();
    let week_index: BTreeMap<NaiveDate, usize> =
        week_starts.iter().enumerate().map(|(i, w)| (*w, i)).collect();

    let mut weekly_weight: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    let mut weekly_points: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for (record, week) in &dated {
        if !visible(&record.assignee) {
            continue;
        }
        let i = week_index[week];
        let width = week_starts.len();
        weekly_weight
            .entry(record.assignee.clone())
            .or_insert_with(|| vec![Decimal::ZERO; width])[i] += record.weight.unwrap_or_default();
        weekly_points
            .entry(record.assignee.clone())
            .or_insert_with(|| vec![Decimal::ZERO; width])[i] += record.leader_points();
    }

    let into_rows = |map: BTreeMap<String, Vec<Decimal>>| -> Vec<WeeklyRow> {
        map.into_iter()
            .map(|(assignee, values)| WeeklyRow { assignee, values })
            .collect()
    };

    Scoreboard {
        totals,
        leaders,
        weeks: week_starts.iter().map(|w| format_day_first(*w)).collect(),
        weekly_weight: into_rows(weekly_weight),
        weekly_leader_points: into_rows(weekly_points),
    }
}

fn visible_names(notes: &RecordSet, roster: &Roster) -> BTreeSet<String> {
    if roster.is_empty() {
        notes
            .assignees()
            .iter()
            .chain(notes.leaders.iter())
            .map(|n| n.to_lowercase())
            .collect()
    } else {
        roster.active_names()
    }
}
