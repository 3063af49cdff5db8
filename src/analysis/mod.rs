//! Analysis of saved pull records: per-pool statistics, a text report, and
//! a JSON export of the computed numbers.

pub mod report;
pub mod statistics;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Catalog;
use crate::logging::Logger;
use crate::records::RecordSet;

/// Analyzes a saved record file and returns the rendered text report.
///
/// The computed statistics are also written as JSON next to the record file
/// (`<stem>_stats.json`).
pub fn analyze_record_file(
    record_path: &Path,
    catalog: &Catalog,
    logger: &Logger,
) -> Result<String> {
    let set = RecordSet::load(record_path)?;
    logger.info(&format!(
        "Analyzing {} entries from {}",
        set.data.len(),
        record_path.display()
    ));

    let stats = statistics::analyze(&set, catalog, logger);

    let export = report::AnalysisExport::new(
        &set.info.game_id,
        &set.info.game_name,
        &set.info.uid,
        &stats,
    );
    let stats_path = stats_output_path(record_path);
    report::export_to_json(&export, &stats_path)
        .with_context(|| format!("Failed to export statistics to {}", stats_path.display()))?;
    logger.info(&format!("Statistics written to {}", stats_path.display()));

    Ok(report::render_report(&set.info, &stats, catalog))
}

fn stats_output_path(record_path: &Path) -> PathBuf {
    let stem = record_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "record".to_string());
    record_path.with_file_name(format!("{}_stats.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{test_entry, test_identity};
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    #[test]
    fn test_analyze_record_file() {
        let dir = tempdir().unwrap();
        let logger = Logger::console_only();

        let catalog: Catalog = serde_json::from_str(
            r#"{
                "item": {"i1": {"display_name": "Gold Char", "rarity": 6}},
                "pool": {"p1": {"display_name": "Pool X", "pool_type": "limited"}}
            }"#,
        )
        .unwrap();

        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let set = RecordSet::build(
            vec![test_entry("Gold Char", "Pool X", "2024-01-01 10:00:00")],
            &test_identity(),
            exported_at,
        );
        let record_path = dir.path().join("ark_20240102_000000.json");
        set.save(&record_path).unwrap();

        let rendered = analyze_record_file(&record_path, &catalog, &logger).unwrap();

        assert!(rendered.contains("Pool: Pool X (limited)"));
        assert!(rendered.contains("Total pulls: 1"));

        let stats_path = dir.path().join("ark_20240102_000000_stats.json");
        let content = std::fs::read_to_string(stats_path).unwrap();
        assert!(content.contains("\"uid\": \"1234567890\""));
        assert!(content.contains("\"Pool X\""));
    }

    #[test]
    fn test_missing_record_file_is_an_error() {
        let dir = tempdir().unwrap();
        let logger = Logger::console_only();
        let catalog = Catalog::default();

        let missing = dir.path().join("nope.json");
        assert!(analyze_record_file(&missing, &catalog, &logger).is_err());
    }
}
