//! Sheet store seam.
//!
//! The engine never talks to a spreadsheet service directly. It is handed a
//! `SheetStore` by reference, reads whole sheets as [`Table`]s and writes
//! whole replacements. There is no partial patching: a write clears the
//! sheet and writes the full table, creating the sheet if it is missing.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::{StoreError, Table};

/// Whole-sheet access to a workbook
pub trait SheetStore {
    /// Read a sheet. `Ok(None)` means the sheet does not exist.
    fn read_sheet(&self, name: &str) -> Result<Option<Table>, StoreError>;

    /// Clear the sheet and write `table` in its place, creating it if needed
    fn replace_sheet(&mut self, name: &str, table: &Table) -> Result<(), StoreError>;

    /// Titles of every sheet, in workbook order
    fn sheet_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Read a sheet, retrying transient transport failures up to `attempts` times.
///
/// The wait before each retry doubles, starting from `backoff`.
pub fn read_with_retry<S: SheetStore + ?Sized>(
    store: &S,
    name: &str,
    attempts: usize,
    backoff: Duration,
) -> Result<Option<Table>, StoreError> {
    let attempts = attempts.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match store.read_sheet(name) {
            Ok(table) => return Ok(table),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = backoff_delay(backoff, attempt);
                warn!(
                    sheet = name,
                    attempt,
                    delay = ?delay,
                    error = %err,
                    "read failed, retrying"
                );
                thread::sleep(delay);
                last = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last.unwrap_or_else(|| StoreError::Transport {
        sheet: name.to_string(),
        message: "no attempts made".into(),
    }))
}

/// Wait after failed attempt `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    let doublings = u32::try_from(attempt.saturating_sub(1)).map_or(10, |n| n.min(10));
    base.saturating_mul(1 << doublings)
}

/// In-memory workbook, keeping sheet insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    order: Vec<String>,
    sheets: BTreeMap<String, Table>,
    failing_reads: Cell<usize>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style sheet insertion
    pub fn with_sheet(mut self, name: &str, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    pub fn insert(&mut self, name: &str, table: Table) {
        if !self.sheets.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.sheets.insert(name.to_string(), table);
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.get(name)
    }

    /// Make the next `count` reads fail with a transport error
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.set(count);
    }

    /// Number of `replace_sheet` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl SheetStore for MemoryStore {
    fn read_sheet(&self, name: &str) -> Result<Option<Table>, StoreError> {
        let failing = self.failing_reads.get();
        if failing > 0 {
            self.failing_reads.set(failing - 1);
            return Err(StoreError::Transport {
                sheet: name.to_string(),
                message: "rate limited".into(),
            });
        }
        Ok(self.sheets.get(name).cloned())
    }

    fn replace_sheet(&mut self, name: &str, table: &Table) -> Result<(), StoreError> {
        self.insert(name, table.clone());
        self.writes += 1;
        Ok(())
    }

    fn sheet_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.order.clone())
    }
}
