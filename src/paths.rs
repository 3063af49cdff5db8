//! Directory layout for configuration, catalogs, history files, and logs.
//!
//! Everything lives under a single data root (`./data` by default) so the
//! tool can be run from any checkout without touching system directories.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataPaths { root: root.into() }
    }

    /// Game processing configs: `<root>/config/`
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Catalog and name data: `<root>/catalog/`
    pub fn catalog_dir(&self) -> PathBuf {
        self.root.join("catalog")
    }

    /// Exported record sets: `<root>/history/`
    pub fn history_dir(&self) -> PathBuf {
        self.root.join("history")
    }

    /// Error ledger file: `<root>/errors/errors.json`
    pub fn error_ledger_file(&self) -> PathBuf {
        self.root.join("errors").join("errors.json")
    }

    /// Log file, next to the data root: `logs/gacha_export.log`
    pub fn log_file(&self) -> PathBuf {
        match self.root.parent() {
            Some(parent) if parent != Path::new("") => {
                parent.join("logs").join("gacha_export.log")
            }
            _ => Path::new("logs").join("gacha_export.log"),
        }
    }

    /// Ensures the output directories exist. Call at startup.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.history_dir())?;
        if let Some(parent) = self.error_ledger_file().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths::new("data")
    }
}
