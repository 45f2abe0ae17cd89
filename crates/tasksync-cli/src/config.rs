//! Configuration file loading.
//!
//! ```toml
//! workbook = "planilha.json"
//!
//! [engine]
//! read_attempts = 5
//! read_backoff_ms = 500
//! week_anchor = "2025-07-04"
//!
//! [engine.sheets]
//! origin = "Total BaseCamp"
//! notes = "Total BaseCamp para Notas"
//! ```
//!
//! Every key is optional. Dates are quoted strings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use tasksync_engine::EngineConfig;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "tasksync.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Workbook path, relative to the working directory
    pub workbook: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl FileConfig {
    /// Load an explicit file, or the default file if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_default() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config.workbook, None);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn partial_sheet_names_keep_defaults() {
        let config = FileConfig::parse(
            r#"
workbook = "book.json"

[engine]
read_attempts = 5
read_backoff_ms = 50
week_anchor = "2025-01-03"

[engine.sheets]
notes = "Notas"
"#,
        )
        .unwrap();
        assert_eq!(config.workbook, Some(PathBuf::from("book.json")));
        assert_eq!(config.engine.read_attempts, 5);
        assert_eq!(config.engine.read_backoff_ms, 50);
        assert_eq!(config.engine.week_anchor, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(config.engine.sheets.notes, "Notas");
        assert_eq!(config.engine.sheets.origin, "Total BaseCamp");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("workbok = \"typo.json\"").is_err());
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }
}
