//! Gacha record export tool.
//!
//! Extracts pull records from game screenshots with OCR, corrects the
//! recognized names against per-game catalogs, merges successive exports
//! into one history file, and reports pull statistics.

mod analysis;
mod config;
mod extract;
mod ledger;
mod logging;
mod paths;
mod pipeline;
mod records;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigManager;
use crate::extract::TesseractCli;
use crate::ledger::{CorrectedFields, CorrectionStatus, ErrorLedger, ErrorRecord};
use crate::logging::Logger;
use crate::paths::DataPaths;
use crate::pipeline::ExtractionRequest;
use crate::records::RecordSet;

#[derive(Parser)]
#[command(name = "gacha-export", version)]
#[command(about = "Extract, merge, and analyze gacha pull records from screenshots")]
struct Cli {
    /// Data directory holding configs, catalogs, and exported history
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract pull records from screenshots and export a record file
    Extract {
        /// Game id (matches the config and catalog file names)
        #[arg(long)]
        game: String,
        /// Account UID stamped into the export
        #[arg(long)]
        uid: String,
        /// UTC offset of the in-game timestamps
        #[arg(long, default_value_t = 8)]
        timezone: i32,
        /// Language tag stamped into the export
        #[arg(long, default_value = "zh-cn")]
        lang: String,
        /// Skip the manual-review error ledger
        #[arg(long)]
        no_error_tracking: bool,
        /// Screenshot files or directories of screenshots
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Analyze an exported record file and print pull statistics
    Analyze {
        /// Game id
        #[arg(long)]
        game: String,
        /// Record file to analyze; defaults to the game's latest export
        record: Option<PathBuf>,
    },
    /// Review entries flagged during extraction
    Errors {
        #[command(subcommand)]
        action: ErrorsAction,
    },
}

#[derive(Subcommand)]
enum ErrorsAction {
    /// List pending entries
    List,
    /// Mark a pending entry corrected and write the fix into the record file
    Fix {
        /// Entry number from `errors list`
        index: usize,
        /// Corrected item name (defaults to the recorded one)
        #[arg(long)]
        item: Option<String>,
        /// Corrected pool name (defaults to the recorded one)
        #[arg(long)]
        pool: Option<String>,
        /// Corrected timestamp, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        time: Option<String>,
    },
    /// Mark a pending entry ignored
    Ignore {
        /// Entry number from `errors list`
        index: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = DataPaths::new(cli.data_dir);
    paths
        .ensure_directories()
        .context("Failed to create data directories")?;
    let logger = Logger::new(paths.log_file());

    match cli.command {
        Command::Extract {
            game,
            uid,
            timezone,
            lang,
            no_error_tracking,
            images,
        } => {
            let engine = TesseractCli::locate()?;
            let request = ExtractionRequest {
                game_id: game,
                uid,
                timezone,
                lang,
                inputs: images,
                track_errors: !no_error_tracking,
            };
            pipeline::run_extraction(&request, &paths, &engine, &logger)?;
        }
        Command::Analyze { game, record } => {
            let manager = ConfigManager::new(paths.clone());
            let catalog = manager.load_catalog(&game)?;
            let record_path = match record {
                Some(path) => path,
                None => latest_export(&paths, &game)?,
            };
            let report = analysis::analyze_record_file(&record_path, &catalog, &logger)?;
            print!("{}", report);
        }
        Command::Errors { action } => {
            let ledger = ErrorLedger::new(paths.error_ledger_file());
            run_errors_action(&ledger, action, &logger)?;
        }
    }
    Ok(())
}

/// Most recent export for a game, by export timestamp in the file header.
fn latest_export(paths: &DataPaths, game_id: &str) -> Result<PathBuf> {
    let files = records::find_history_files(&paths.history_dir(), game_id, &PathBuf::new())?;
    let mut latest: Option<(PathBuf, i64)> = None;
    for path in files {
        let set = RecordSet::load(&path)?;
        if latest
            .as_ref()
            .map_or(true, |(_, ts)| set.info.export_timestamp > *ts)
        {
            latest = Some((path, set.info.export_timestamp));
        }
    }
    match latest {
        Some((path, _)) => Ok(path),
        None => bail!("No exported records found for game '{}'", game_id),
    }
}

fn run_errors_action(ledger: &ErrorLedger, action: ErrorsAction, logger: &Logger) -> Result<()> {
    match action {
        ErrorsAction::List => {
            let pending = ledger.pending()?;
            if pending.is_empty() {
                println!("No pending entries.");
                return Ok(());
            }
            for (i, record) in pending.iter().enumerate() {
                print_pending(i, record);
            }
        }
        ErrorsAction::Fix {
            index,
            item,
            pool,
            time,
        } => {
            let record = pending_at(ledger, index)?;
            let corrected = CorrectedFields {
                item: item.unwrap_or_else(|| record.original.item.clone()),
                pool: pool.unwrap_or_else(|| record.original.pool.clone()),
                time: time.unwrap_or_else(|| record.original.time.clone()),
            };
            if ledger.resolve(&record, CorrectionStatus::Corrected, Some(corrected), logger)? {
                println!("Entry {} corrected.", index);
            } else {
                bail!("Entry {} no longer exists in the ledger", index);
            }
        }
        ErrorsAction::Ignore { index } => {
            let record = pending_at(ledger, index)?;
            if ledger.resolve(&record, CorrectionStatus::Ignored, None, logger)? {
                println!("Entry {} ignored.", index);
            } else {
                bail!("Entry {} no longer exists in the ledger", index);
            }
        }
    }
    Ok(())
}

fn pending_at(ledger: &ErrorLedger, index: usize) -> Result<ErrorRecord> {
    let mut pending = ledger.pending()?;
    if index >= pending.len() {
        bail!(
            "No pending entry {} ({} pending, see `errors list`)",
            index,
            pending.len()
        );
    }
    Ok(pending.remove(index))
}

fn print_pending(index: usize, record: &ErrorRecord) {
    let mut flags = Vec::new();
    if record.errors.item_invalid {
        flags.push("item");
    }
    if record.errors.pool_invalid {
        flags.push("pool");
    }
    if record.errors.time_invalid {
        flags.push("time");
    }
    println!(
        "[{}] {} | {} | {}  (invalid: {})",
        index,
        record.original.item,
        record.original.pool,
        if record.original.time.is_empty() {
            "?"
        } else {
            &record.original.time
        },
        flags.join(", ")
    );
    if let Some(source) = &record.context.source {
        println!("      from {}", source);
    }
}
