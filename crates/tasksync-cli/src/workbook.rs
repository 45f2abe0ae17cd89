//! JSON workbook file.
//!
//! A workbook is a list of named sheets, each a grid of cells whose first
//! row is the header:
//!
//! ```json
//! { "sheets": [ { "name": "Equipes", "rows": [["Nome", "Status"], ["Ana", "Ativo"]] } ] }
//! ```
//!
//! Cells may be strings, numbers, booleans or null; they are read as text.
//! Every write rewrites the whole file through a temporary file and a rename,
//! so a failed write leaves the previous file in place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tasksync_core::{SheetStore, StoreError, Table};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkbookFile {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SheetEntry {
    name: String,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// A workbook backed by one JSON file
#[derive(Debug)]
pub struct JsonWorkbook {
    path: PathBuf,
    file: WorkbookFile,
}

impl JsonWorkbook {
    /// Open a workbook. A missing file is an empty workbook, created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)
                .map_err(|e| StoreError::Format(format!("{}: {e}", path.display())))?
        } else {
            debug!(path = %path.display(), "workbook not found, starting empty");
            WorkbookFile::default()
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.file)
            .map_err(|e| StoreError::Format(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SheetStore for JsonWorkbook {
    fn read_sheet(&self, name: &str) -> Result<Option<Table>, StoreError> {
        Ok(self.file.sheets.iter().find(|s| s.name == name).map(|sheet| {
            Table::from_values(
                sheet
                    .rows
                    .iter()
                    .map(|row| row.iter().map(cell_text).collect())
                    .collect(),
            )
        }))
    }

    fn replace_sheet(&mut self, name: &str, table: &Table) -> Result<(), StoreError> {
        let rows: Vec<Vec<Value>> = table
            .to_values()
            .into_iter()
            .map(|row| row.into_iter().map(Value::String).collect())
            .collect();
        match self.file.sheets.iter_mut().find(|s| s.name == name) {
            Some(sheet) => sheet.rows = rows,
            None => self.file.sheets.push(SheetEntry {
                name: name.to_string(),
                rows,
            }),
        }
        self.persist()?;
        debug!(sheet = name, rows = table.len(), "sheet persisted");
        Ok(())
    }

    fn sheet_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.file.sheets.iter().map(|s| s.name.clone()).collect())
    }
}
