//! # tasksync-engine
//!
//! Reconciliation and synchronization engine for task sheets.
//!
//! This crate provides:
//! - Origin → notes reconciliation with field-level authority
//! - Month bucket and backlog selection, plus audits of what was left out
//! - Weekly history counters and consolidated snapshots
//! - Editor operations (scores, assignee correction, leader promotion, deletion)
//! - Score summaries per assignee and per week
//! - Store-driven pipelines tying the above to a [`SheetStore`]
//!
//! ## Example
//!
//! ```rust
//! use tasksync_core::{MemoryStore, Table};
//! use tasksync_engine::{pipeline, EngineConfig};
//!
//! let header = ["Link", "Encarregado", "Peso", "Data Final", "Lista"];
//! let mut origin = Table::with_header(header);
//! origin.rows.push(vec!["https://bc/todos/1".into(), "Ana".into(), "".into(), "".into(), "".into()]);
//!
//! let config = EngineConfig::default();
//! let mut store = MemoryStore::new().with_sheet(&config.sheets.origin, origin);
//!
//! let report = pipeline::sync_notes(&mut store, &config).unwrap();
//! assert_eq!(report.new_ids, vec!["1".to_string()]);
//! assert!(report.written);
//! ```

pub mod edit;
pub mod monthly;
pub mod pipeline;
pub mod reconcile;
pub mod scoreboard;
pub mod snapshot;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use reconcile::{reconcile, Discrepancy, DiscrepancyField, Reconciliation};
pub use snapshot::{aggregate, Aggregate, Counters, History};

/// Default number of attempts for sheet reads
pub const DEFAULT_READ_ATTEMPTS: usize = 3;

/// Default wait before the first read retry, in milliseconds
pub const DEFAULT_READ_BACKOFF_MS: u64 = 200;

// ============================================================================
// Configuration
// ============================================================================

/// Titles of the sheets the engine reads and writes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    /// Raw upstream pool
    pub origin: String,
    /// Working set annotated by editors
    pub notes: String,
    /// Team roster with leader flags
    pub roster: String,
    /// One row of counters per business day
    pub history: String,
    /// Stacked monthly snapshots
    pub consolidated: String,
    /// Undated tasks
    pub backlog: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            origin: "Total BaseCamp".into(),
            notes: "Total BaseCamp para Notas".into(),
            roster: "Equipes".into(),
            history: "Historico".into(),
            consolidated: "Consolidado".into(),
            backlog: "Backlog".into(),
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sheets: SheetNames,
    /// Sheet whose records feed the history counters (origin when unset)
    pub history_source: Option<String>,
    /// Attempts per sheet read before a transport failure is surfaced
    pub read_attempts: usize,
    /// Wait before the first retry, doubled on each further retry
    pub read_backoff_ms: u64,
    /// First day of the first scoreboard week
    pub week_anchor: NaiveDate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sheets: SheetNames::default(),
            history_source: None,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            read_backoff_ms: DEFAULT_READ_BACKOFF_MS,
            week_anchor: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap_or_default(),
        }
    }
}

impl EngineConfig {
    pub fn read_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.read_backoff_ms)
    }

    pub fn history_source(&self) -> &str {
        self.history_source
            .as_deref()
            .unwrap_or(&self.sheets.origin)
    }
}
