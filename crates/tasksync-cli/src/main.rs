//! tasksync CLI - Task Sheet Reconciliation
//!
//! Command-line interface for syncing, snapshotting and editing a task workbook.

mod config;
mod output;
mod workbook;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tasksync_core::bucket::MonthBucket;
use tasksync_core::numeric;
use tasksync_core::roster::StatusFilter;
use tasksync_engine::edit::RecordEdit;
use tasksync_engine::pipeline;

use crate::config::FileConfig;
use crate::output::{emit, Assignees, ExitCode, Format, Renamed};
use crate::workbook::JsonWorkbook;

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(author, version, about = "Task sheet reconciliation engine", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file [default: ./tasksync.toml when present]
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Workbook file
    #[arg(short, long, global = true, env = "TASKSYNC_WORKBOOK", value_name = "FILE")]
    workbook: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Date to use as today (YYYY-MM-DD)
    #[arg(long, global = true, value_name = "DATE")]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring new and changed origin tasks into the notes sheet
    SyncNotes {
        /// Exit 1 when discrepancies are flagged
        #[arg(long)]
        strict: bool,
    },

    /// Rebuild a month sheet from origin
    SyncMonth {
        /// Month sheet name, e.g. "Novembro 2025" [default: current month]
        #[arg(value_name = "MONTH")]
        month: Option<String>,
    },

    /// Rebuild the backlog sheet from undated origin tasks
    SyncBacklog,

    /// Record this week's counters in the history sheet
    History {
        /// Day to record [default: today]
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },

    /// Stack month sheets into the consolidated sheet
    Consolidate {
        /// Month sheets to stack [default: every month sheet]
        #[arg(value_name = "SHEET")]
        sheets: Vec<String>,
    },

    /// Check a month sheet against its month and against origin
    Audit {
        /// Month sheet name [default: current month]
        #[arg(value_name = "MONTH")]
        month: Option<String>,
    },

    /// Set the weight or leader scores of a task
    SetScore {
        /// Task ID
        id: String,

        /// New weight (empty clears it)
        #[arg(long)]
        weight: Option<String>,

        /// Leader score as LEADER=POINTS (empty points clear it)
        #[arg(long = "score", value_name = "LEADER=POINTS")]
        scores: Vec<String>,
    },

    /// Replace a misspelled assignee name in the notes sheet
    RenameAssignee {
        /// Name as currently written
        from: String,
        /// Correct name
        to: String,
    },

    /// Make a roster member a leader
    PromoteLeader {
        /// Name as listed in the roster
        name: String,
    },

    /// Delete a task from origin and a month sheet
    Delete {
        /// Task ID
        id: String,

        /// Month sheet [default: current month]
        #[arg(long, value_name = "MONTH")]
        month: Option<String>,
    },

    /// List notes assignees by roster status
    Assignees {
        /// all, active, inactive or unlisted
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Show the scoreboard
    Report,
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match run(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::Failure.into()
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let config = file_config.engine;
    let path = cli
        .workbook
        .or(file_config.workbook)
        .context("no workbook given; use --workbook or TASKSYNC_WORKBOOK")?;
    let mut book = JsonWorkbook::open(&path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    info!(workbook = %book.path().display(), "opened workbook");

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let format = cli.format;
    let month_or_current = |month: Option<String>| -> Result<MonthBucket> {
        match month {
            Some(name) => Ok(name.parse()?),
            None => Ok(MonthBucket::of(today)),
        }
    };

    match cli.command {
        Commands::SyncNotes { strict } => {
            let report = pipeline::sync_notes(&mut book, &config)?;
            emit(format, &report)?;
            if strict {
                return Ok(ExitCode::from_failures(report.discrepancies.len()));
            }
        }
        Commands::SyncMonth { month } => {
            let bucket = month_or_current(month)?;
            emit(format, &pipeline::sync_month(&mut book, &config, bucket, today)?)?;
        }
        Commands::SyncBacklog => {
            emit(format, &pipeline::sync_backlog(&mut book, &config)?)?;
        }
        Commands::History { date } => {
            let as_of = date.unwrap_or(today);
            emit(format, &pipeline::record_history(&mut book, &config, as_of)?)?;
        }
        Commands::Consolidate { sheets } => {
            emit(format, &pipeline::consolidate(&mut book, &config, &sheets)?)?;
        }
        Commands::Audit { month } => {
            let bucket = month_or_current(month)?;
            emit(format, &pipeline::audit_month(&book, &config, bucket, today)?)?;
        }
        Commands::SetScore { id, weight, scores } => {
            let mut edit = RecordEdit::new(id);
            if let Some(text) = weight {
                edit = edit.weight(parse_points(&text)?);
            }
            for score in &scores {
                let (leader, points) = score
                    .split_once('=')
                    .with_context(|| format!("expected LEADER=POINTS, got '{score}'"))?;
                edit = edit.score(leader.trim(), parse_points(points)?);
            }
            let report = pipeline::save_edits(&mut book, &config, &[edit])?;
            emit(format, &report)?;
            return Ok(ExitCode::from_failures(report.outcome.unknown.len()));
        }
        Commands::RenameAssignee { from, to } => {
            let records = pipeline::correct_assignee(&mut book, &config, &from, &to)?;
            emit(format, &Renamed { from, to, records })?;
        }
        Commands::PromoteLeader { name } => {
            emit(format, &pipeline::promote_leader(&mut book, &config, &name)?)?;
        }
        Commands::Delete { id, month } => {
            let bucket = month_or_current(month)?;
            emit(format, &pipeline::delete_task(&mut book, &config, &id, bucket)?)?;
        }
        Commands::Assignees { status } => {
            let assignees = pipeline::assignees(&book, &config, status)?;
            emit(format, &Assignees { assignees })?;
        }
        Commands::Report => {
            emit(format, &pipeline::report(&book, &config)?)?;
        }
    }

    Ok(ExitCode::Success)
}

/// A weight or score; blank clears the cell
fn parse_points(text: &str) -> Result<Option<Decimal>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    numeric::parse(text)
        .map(Some)
        .with_context(|| format!("'{text}' is not a number"))
}
