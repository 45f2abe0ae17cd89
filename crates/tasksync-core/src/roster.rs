//! Team roster: who is a leader and who is active.
//!
//! The roster sheet lists one person per row with `Nome`, `Posição` and
//! `Status` columns. Leader score columns in the notes sheet are whatever
//! columns match a roster name whose position is `Lider`, so the leader set
//! is recomputed from this sheet on every pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{SyncError, Table};

pub const NAME: &str = "Nome";
pub const POSITION: &str = "Posição";
pub const STATUS: &str = "Status";

pub const LEADER_POSITION: &str = "Lider";
pub const ACTIVE_STATUS: &str = "Ativo";
pub const INACTIVE_STATUS: &str = "Desativado";

/// Roster status of a person
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
    /// Listed with a blank or unrecognized status
    Other,
    /// Not listed in the roster at all
    Unlisted,
}

/// Assignee filter by roster status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
    Unlisted,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "todos" => Ok(StatusFilter::All),
            "active" | "ativos" => Ok(StatusFilter::Active),
            "inactive" | "desativados" => Ok(StatusFilter::Inactive),
            "unlisted" | "nao-listados" => Ok(StatusFilter::Unlisted),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

/// The roster sheet
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roster {
    table: Table,
}

impl Roster {
    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    /// Roster with no members (missing sheet)
    pub fn empty() -> Self {
        Self::from_table(Table::with_header([NAME, POSITION, STATUS]))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn row_of(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        (0..self.table.len()).find(|&row| self.table.cell(row, NAME).trim() == wanted)
    }

    /// Names as listed, in sheet order
    pub fn names(&self) -> Vec<String> {
        (0..self.table.len())
            .map(|row| self.table.cell(row, NAME).trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.row_of(name).is_some()
    }

    /// Lower-cased names of everyone whose position is `Lider`
    pub fn leader_names(&self) -> BTreeSet<String> {
        (0..self.table.len())
            .filter(|&row| self.table.cell(row, POSITION).trim() == LEADER_POSITION)
            .map(|row| self.table.cell(row, NAME).trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect()
    }

    pub fn status_of(&self, name: &str) -> MemberStatus {
        match self.row_of(name) {
            None => MemberStatus::Unlisted,
            Some(row) => match self.table.cell(row, STATUS).trim() {
                ACTIVE_STATUS => MemberStatus::Active,
                INACTIVE_STATUS => MemberStatus::Inactive,
                _ => MemberStatus::Other,
            },
        }
    }

    /// Lower-cased names with `Ativo` status
    pub fn active_names(&self) -> BTreeSet<String> {
        (0..self.table.len())
            .filter(|&row| self.table.cell(row, STATUS).trim() == ACTIVE_STATUS)
            .map(|row| self.table.cell(row, NAME).trim().to_lowercase())
            .collect()
    }

    /// Keep the assignees matching `filter`, preserving order
    pub fn filter_assignees(&self, assignees: &[String], filter: StatusFilter) -> Vec<String> {
        assignees
            .iter()
            .filter(|a| match filter {
                StatusFilter::All => true,
                StatusFilter::Active => self.status_of(a) == MemberStatus::Active,
                StatusFilter::Inactive => self.status_of(a) == MemberStatus::Inactive,
                StatusFilter::Unlisted => self.status_of(a) == MemberStatus::Unlisted,
            })
            .cloned()
            .collect()
    }

    /// Mark `name` as a leader. Returns whether the sheet changed.
    pub fn promote(&mut self, name: &str) -> Result<bool, SyncError> {
        let row = self
            .row_of(name)
            .ok_or_else(|| SyncError::NotInRoster(name.to_string()))?;
        self.table.add_column(POSITION);
        let col = self
            .table
            .column_index(POSITION)
            .ok_or_else(|| SyncError::InvalidTable {
                bucket: "roster".into(),
                message: format!("missing column {POSITION}"),
            })?;
        let cell = &mut self.table.rows[row][col];
        if cell.trim() == LEADER_POSITION {
            return Ok(false);
        }
        *cell = LEADER_POSITION.to_string();
        Ok(true)
    }
}
