//! Persistent ledger of low-confidence entries awaiting manual correction.
//!
//! The ledger is one JSON array on disk. Every mutation is a whole-file
//! read-modify-write; there is deliberately no locking, the tool assumes a
//! single writer. The ledger is cleared at the start of each extraction run
//! and repopulated by the cleaner; the operator later resolves entries as
//! corrected (optionally writing the fix back into the record-set file) or
//! ignored.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::correct::Correction;
use crate::logging::Logger;
use crate::records::RecordSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalEntry {
    pub item: String,
    pub pool: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErrorFlags {
    pub item_invalid: bool,
    pub pool_invalid: bool,
    pub time_invalid: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Source image the entry came from
    pub source: Option<String>,
    /// Entry index within that image
    pub position: Option<usize>,
    /// Record-set file the entry was exported to, stamped at end of run
    pub record_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Corrected,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedFields {
    pub item: String,
    pub pool: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub original: OriginalEntry,
    pub errors: ErrorFlags,
    pub context: ErrorContext,
    pub correction_status: CorrectionStatus,
    /// Creation instant; together with `original` it identifies the record
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<CorrectedFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_at: Option<String>,
}

pub struct ErrorLedger {
    file_path: PathBuf,
}

impl ErrorLedger {
    pub fn new(file_path: PathBuf) -> Self {
        ErrorLedger { file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Discards all recorded errors. Called once before each extraction run.
    pub fn clear(&self, logger: &Logger) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).with_context(|| {
                format!("Failed to clear error ledger: {}", self.file_path.display())
            })?;
            logger.info("Cleared error ledger");
        }
        Ok(())
    }

    /// Appends a pending record for a flagged entry. The stored values are
    /// the post-correction ones, so the operator sees what the pipeline
    /// actually exported.
    pub fn record(
        &self,
        item_result: &Correction,
        pool_result: &Correction,
        time: Option<&str>,
        context: ErrorContext,
    ) -> Result<()> {
        let record = ErrorRecord {
            original: OriginalEntry {
                item: item_result.name.clone(),
                pool: pool_result.name.clone(),
                time: time.unwrap_or_default().to_string(),
            },
            errors: ErrorFlags {
                item_invalid: !item_result.is_valid,
                pool_invalid: !pool_result.is_valid,
                time_invalid: time.is_none(),
            },
            context,
            correction_status: CorrectionStatus::Pending,
            timestamp: Local::now().to_rfc3339(),
            corrected: None,
            corrected_at: None,
        };

        let mut records = self.read_all()?;
        records.push(record);
        self.write_all(&records)
    }

    /// All records still awaiting operator action.
    pub fn pending(&self) -> Result<Vec<ErrorRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.correction_status == CorrectionStatus::Pending)
            .collect())
    }

    /// Stamps the exported record-set path into every record's context so
    /// later corrections know which file to rewrite.
    pub fn attach_record_path(&self, record_path: &Path) -> Result<()> {
        let mut records = self.read_all()?;
        if records.is_empty() {
            return Ok(());
        }
        for record in &mut records {
            record.context.record_path = Some(record_path.display().to_string());
        }
        self.write_all(&records)
    }

    /// Resolves the record matching `target`'s identity (original fields +
    /// creation timestamp). When corrected fields are supplied, they are also
    /// written back into the originating record-set file; a missing file or
    /// unmatched entry there is logged and does not fail the resolution.
    ///
    /// Returns false when no ledger record matched.
    pub fn resolve(
        &self,
        target: &ErrorRecord,
        new_status: CorrectionStatus,
        corrected: Option<CorrectedFields>,
        logger: &Logger,
    ) -> Result<bool> {
        let mut records = self.read_all()?;
        let found = records
            .iter_mut()
            .find(|r| r.original == target.original && r.timestamp == target.timestamp);

        let record = match found {
            Some(record) => record,
            None => return Ok(false),
        };

        record.correction_status = new_status;
        if let Some(corrected) = corrected {
            record.corrected = Some(corrected.clone());
            record.corrected_at = Some(Local::now().to_rfc3339());
            propagate_correction(record, &corrected, logger);
        }

        self.write_all(&records)?;
        Ok(true)
    }

    fn read_all(&self) -> Result<Vec<ErrorRecord>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.file_path).with_context(|| {
            format!("Failed to read error ledger: {}", self.file_path.display())
        })?;
        serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse error ledger: {}", self.file_path.display())
        })
    }

    fn write_all(&self, records: &[ErrorRecord]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records).context("Failed to serialize ledger")?;
        fs::write(&self.file_path, json).with_context(|| {
            format!("Failed to write error ledger: {}", self.file_path.display())
        })
    }
}

/// Rewrites the matching entry in the originating record-set file. All
/// failures here are non-fatal: the ledger entry is already resolved, the
/// operator can re-export if the file went missing.
fn propagate_correction(record: &ErrorRecord, corrected: &CorrectedFields, logger: &Logger) {
    let path = match &record.context.record_path {
        Some(path) => PathBuf::from(path),
        None => {
            logger.warn("Corrected record has no record-set path attached; nothing to update");
            return;
        }
    };

    let mut set = match RecordSet::load(&path) {
        Ok(set) => set,
        Err(e) => {
            logger.error(&format!("Could not update record set: {:#}", e));
            return;
        }
    };

    let mut updated = 0;
    for entry in &mut set.data {
        if entry.item == record.original.item
            && entry.pool == record.original.pool
            && entry.time == record.original.time
        {
            entry.item = corrected.item.clone();
            entry.pool = corrected.pool.clone();
            entry.time = corrected.time.clone();
            entry.is_valid = true;
            updated += 1;
        }
    }

    if updated == 0 {
        logger.warn(&format!(
            "No entry matching {} / {} / {} in {}",
            record.original.item,
            record.original.pool,
            record.original.time,
            path.display()
        ));
        return;
    }

    if let Err(e) = set.save(&path) {
        logger.error(&format!("Could not save corrected record set: {:#}", e));
    } else {
        logger.info(&format!(
            "Updated {} entry(ies) in {}",
            updated,
            path.display()
        ));
    }
}
