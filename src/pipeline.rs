//! Batch extraction: screenshots in, one merged record-set file out.
//!
//! The run is sequential and fail-soft per image; it only aborts when the
//! configuration is missing or the whole batch yields zero entries. After a
//! fresh export the history directory is checked for an earlier compatible
//! file, and the two are merged when they share an overlap run; the old file
//! is then deleted. Without an overlap both files are kept.

use anyhow::{Context, Result, bail};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigManager;
use crate::extract::{self, EntryCleaner, LineParser, NameSet, OcrEngine};
use crate::ledger::ErrorLedger;
use crate::logging::Logger;
use crate::paths::DataPaths;
use crate::records::{self, ExportIdentity, RecordSet, merge};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Inputs for one extraction run.
pub struct ExtractionRequest {
    pub game_id: String,
    pub uid: String,
    pub timezone: i32,
    pub lang: String,
    /// Image files or directories of image files
    pub inputs: Vec<PathBuf>,
    /// When false, flagged entries are exported but not written to the
    /// error ledger.
    pub track_errors: bool,
}

/// Runs the full extraction pipeline and returns the path of the exported
/// record-set file.
pub fn run_extraction(
    request: &ExtractionRequest,
    paths: &DataPaths,
    engine: &dyn OcrEngine,
    logger: &Logger,
) -> Result<PathBuf> {
    let manager = ConfigManager::new(paths.clone());
    let config = manager.load_game_config(&request.game_id)?;
    let name_data = manager.load_name_data(&request.game_id)?;

    let ledger = if request.track_errors {
        let ledger = ErrorLedger::new(paths.error_ledger_file());
        ledger.clear(logger)?;
        Some(ledger)
    } else {
        None
    };

    let images = expand_image_sources(&request.inputs)?;
    logger.info(&format!(
        "Starting extraction for {}: {} image(s)",
        config.game_info.game_name,
        images.len()
    ));

    let valid_items = NameSet::new(name_data.character);
    let valid_pools = NameSet::new(name_data.pool);
    let parser = LineParser::new(config.table_area.column_indices)?;
    let cleaner = EntryCleaner::new(&config.text_processing, &valid_items, &valid_pools)?;

    let mut entries = Vec::new();
    for image in &images {
        entries.extend(extract::process_image(
            image,
            &config,
            &parser,
            &cleaner,
            engine,
            ledger.as_ref(),
            logger,
        ));
    }
    if entries.is_empty() {
        bail!("No entries extracted from {} image(s)", images.len());
    }

    let identity = ExportIdentity {
        game_id: config.game_info.game_id.clone(),
        game_name: config.game_info.game_name.clone(),
        uid: request.uid.clone(),
        timezone: request.timezone,
        lang: request.lang.clone(),
    };
    let set = RecordSet::build(entries, &identity, Local::now());

    fs::create_dir_all(paths.history_dir())
        .with_context(|| format!("Failed to create {}", paths.history_dir().display()))?;
    let output_path = paths.history_dir().join(set.file_name());
    set.save(&output_path)?;
    logger.info(&format!(
        "Exported {} entries to {}",
        set.info.total_entries,
        output_path.display()
    ));

    let final_set = merge_with_history(&set, &output_path, paths, logger)?;

    if let Some(ledger) = &ledger {
        ledger.attach_record_path(&output_path)?;
        let pending = ledger.pending()?.len();
        if pending > 0 {
            logger.warn(&format!(
                "{} entry(ies) need manual review, see `errors list`",
                pending
            ));
        }
    }

    logger.info(&format!(
        "Done: {} total entries on record",
        final_set.info.total_entries
    ));
    Ok(output_path)
}

/// Merges the fresh export with the latest compatible history file, if any.
/// On success the merged set replaces the fresh file and the old file is
/// deleted. A failed merge keeps both files.
fn merge_with_history(
    set: &RecordSet,
    output_path: &Path,
    paths: &DataPaths,
    logger: &Logger,
) -> Result<RecordSet> {
    let candidates =
        records::find_history_files(&paths.history_dir(), &set.info.game_id, output_path)?;
    let (previous_path, previous) =
        match records::latest_compatible_file(&set.info, &candidates, logger) {
            Some(found) => found,
            None => return Ok(set.clone()),
        };

    match merge::merge(set, &previous) {
        Ok(merged) => {
            merged.save(output_path)?;
            logger.info(&format!(
                "Merged with {}: {} entries total",
                previous_path.display(),
                merged.info.total_entries
            ));
            if let Err(e) = fs::remove_file(&previous_path) {
                logger.warn(&format!(
                    "Could not remove superseded file {}: {}",
                    previous_path.display(),
                    e
                ));
            }
            Ok(merged)
        }
        Err(e) => {
            logger.warn(&format!(
                "Not merging with {}: {}",
                previous_path.display(),
                e
            ));
            Ok(set.clone())
        }
    }
}

/// Expands files and directories into a flat image list. Directory contents
/// are sorted by name so batches process in a stable order.
fn expand_image_sources(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut batch: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to read directory: {}", input.display()))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| is_image_file(path))
                .collect();
            batch.sort();
            images.extend(batch);
        } else {
            images.push(input.clone());
        }
    }
    if images.is_empty() {
        bail!("No input images found");
    }
    Ok(images)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
