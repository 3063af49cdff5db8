//! Record-set data model and JSON persistence.
//!
//! A record set is one exported batch of pulls: an `info` header identifying
//! the account plus the entries sorted newest-first. Files are named
//! `{game_id}_{YYYYMMDD_HHMMSS}.json` and live in the history directory;
//! sets from the same account are merged across exports (see `merge`).

pub mod merge;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::Logger;

pub const EXPORT_APP: &str = "gacha-export";
pub const EXPORT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One pull as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullEntry {
    pub item: String,
    pub pool: String,
    /// Normalized `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInfo {
    pub game_id: String,
    pub game_name: String,
    pub export_timestamp: i64,
    pub export_app: String,
    pub export_app_version: String,
    pub export_time: String,
    pub uid: String,
    pub timezone: i32,
    pub lang: String,
    pub total_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    pub info: RecordInfo,
    pub data: Vec<PullEntry>,
}

/// Account fields for a fresh export.
#[derive(Debug, Clone)]
pub struct ExportIdentity {
    pub game_id: String,
    pub game_name: String,
    pub uid: String,
    pub timezone: i32,
    pub lang: String,
}

impl RecordSet {
    /// Builds an export from cleaned entries, sorted by time descending
    /// (newest first).
    pub fn build(
        mut entries: Vec<PullEntry>,
        identity: &ExportIdentity,
        exported_at: DateTime<Local>,
    ) -> Self {
        entries.sort_by(|a, b| b.time.cmp(&a.time));
        let info = RecordInfo {
            game_id: identity.game_id.clone(),
            game_name: identity.game_name.clone(),
            export_timestamp: exported_at.timestamp(),
            export_app: EXPORT_APP.to_string(),
            export_app_version: EXPORT_APP_VERSION.to_string(),
            export_time: exported_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            uid: identity.uid.clone(),
            timezone: identity.timezone,
            lang: identity.lang.clone(),
            total_entries: entries.len(),
        };
        RecordSet {
            info,
            data: entries,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read record file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse record file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize record set")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write record file: {}", path.display()))
    }

    /// Conventional file name: `{game_id}_{YYYYMMDD_HHMMSS}.json`.
    pub fn file_name(&self) -> String {
        let stamp = Local
            .timestamp_opt(self.info.export_timestamp, 0)
            .single()
            .map(|dt| dt.format("%Y%m%d_%H%M%S").to_string())
            .unwrap_or_else(|| self.info.export_timestamp.to_string());
        format!("{}_{}.json", self.info.game_id, stamp)
    }
}

/// Lists existing history files for a game, excluding the freshly written
/// one. Statistics exports (`*_stats.json`) living in the same directory
/// are not record sets and are skipped. Ordering is not significant;
/// callers pick by export timestamp.
pub fn find_history_files(dir: &Path, game_id: &str, exclude: &Path) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_", game_id);
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read history directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with(&prefix)
            && name.ends_with(".json")
            && !name.ends_with("_stats.json")
            && path != exclude
        {
            files.push(path);
        }
    }
    Ok(files)
}

/// Finds the most recently exported file compatible with `info`
/// (same game_id, uid, timezone, and lang). Unreadable or incompatible
/// files are skipped with a log line.
pub fn latest_compatible_file(
    info: &RecordInfo,
    candidates: &[PathBuf],
    logger: &Logger,
) -> Option<(PathBuf, RecordSet)> {
    let mut latest: Option<(PathBuf, RecordSet)> = None;
    for path in candidates {
        let set = match RecordSet::load(path) {
            Ok(set) => set,
            Err(e) => {
                logger.error(&format!("Failed to read {}: {:#}", path.display(), e));
                continue;
            }
        };
        if let Err(e) = merge::check_compatibility(info, &set.info) {
            logger.warn(&format!("Skipping {}: {}", path.display(), e));
            continue;
        }
        let newer = latest
            .as_ref()
            .map_or(true, |(_, best)| {
                set.info.export_timestamp > best.info.export_timestamp
            });
        if newer {
            latest = Some((path.clone(), set));
        }
    }
    latest
}

#[cfg(test)]
pub(crate) fn test_entry(item: &str, pool: &str, time: &str) -> PullEntry {
    PullEntry {
        item: item.to_string(),
        pool: pool.to_string(),
        time: time.to_string(),
        is_valid: true,
    }
}

#[cfg(test)]
pub(crate) fn test_identity() -> ExportIdentity {
    ExportIdentity {
        game_id: "ark".to_string(),
        game_name: "Arknights".to_string(),
        uid: "1234567890".to_string(),
        timezone: 8,
        lang: "zh-cn".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sorts_newest_first() {
        let entries = vec![
            test_entry("A", "P", "2024-01-01 09:00:00"),
            test_entry("B", "P", "2024-01-01 11:00:00"),
            test_entry("C", "P", "2024-01-01 10:00:00"),
        ];
        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let set = RecordSet::build(entries, &test_identity(), exported_at);

        assert_eq!(set.info.total_entries, 3);
        assert_eq!(set.data[0].item, "B");
        assert_eq!(set.data[1].item, "C");
        assert_eq!(set.data[2].item, "A");
        assert_eq!(set.info.export_time, "2024-01-02 12:00:00");
    }

    #[test]
    fn test_file_name_convention() {
        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 12, 30, 45).unwrap();
        let set = RecordSet::build(Vec::new(), &test_identity(), exported_at);
        assert_eq!(set.file_name(), "ark_20240102_123045.json");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ark_test.json");
        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let set = RecordSet::build(
            vec![test_entry("A", "P", "2024-01-01 10:00:00")],
            &test_identity(),
            exported_at,
        );

        set.save(&path).unwrap();
        let loaded = RecordSet::load(&path).unwrap();

        assert_eq!(loaded.info.uid, "1234567890");
        assert_eq!(loaded.data, set.data);
    }

    #[test]
    fn test_find_history_files_filters_by_game() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "ark_20240101_000000.json",
            "ark_20240102_000000.json",
            "ark_20240101_000000_stats.json",
            "other_20240101_000000.json",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let exclude = dir.path().join("ark_20240102_000000.json");
        let files = find_history_files(dir.path(), "ark", &exclude).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("ark_20240101_000000.json"));
    }

    #[test]
    fn test_latest_compatible_picks_newest_matching() {
        let logger = Logger::console_only();
        let dir = tempfile::tempdir().unwrap();

        let old = RecordSet::build(
            Vec::new(),
            &test_identity(),
            Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        let new = RecordSet::build(
            Vec::new(),
            &test_identity(),
            Local.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
        );
        let mut foreign = new.clone();
        foreign.info.uid = "other".to_string();
        foreign.info.export_timestamp += 1000;

        let old_path = dir.path().join("a.json");
        let new_path = dir.path().join("b.json");
        let foreign_path = dir.path().join("c.json");
        old.save(&old_path).unwrap();
        new.save(&new_path).unwrap();
        foreign.save(&foreign_path).unwrap();

        let current = RecordSet::build(
            Vec::new(),
            &test_identity(),
            Local.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap(),
        );
        let (path, found) = latest_compatible_file(
            &current.info,
            &[old_path, new_path.clone(), foreign_path],
            &logger,
        )
        .unwrap();

        assert_eq!(path, new_path);
        assert_eq!(found.info.export_timestamp, new.info.export_timestamp);
    }
}
