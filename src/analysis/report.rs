//! Human-readable analysis report and JSON export of the computed
//! statistics.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::statistics::{PoolStats, TRACKED_RARITIES};
use crate::config::Catalog;
use crate::records::RecordInfo;

/// Serialized alongside the per-pool stats so the JSON file is
/// self-describing.
#[derive(Debug, Serialize)]
pub struct AnalysisExport<'a> {
    pub game_id: &'a str,
    pub game_name: &'a str,
    pub uid: &'a str,
    pub total_pulls: u32,
    pub pools: BTreeMap<&'a str, PoolReport<'a>>,
}

/// One pool's stats with the derived numbers included, so the JSON file
/// carries the same figures as the rendered report.
#[derive(Debug, Serialize)]
pub struct PoolReport<'a> {
    #[serde(flatten)]
    pub stats: &'a PoolStats,
    pub gold_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_gold_interval: Option<f64>,
}

impl<'a> AnalysisExport<'a> {
    pub fn new(
        game_id: &'a str,
        game_name: &'a str,
        uid: &'a str,
        stats: &'a BTreeMap<String, PoolStats>,
    ) -> Self {
        AnalysisExport {
            game_id,
            game_name,
            uid,
            total_pulls: stats.values().map(|s| s.total_pulls).sum(),
            pools: stats
                .iter()
                .map(|(name, stats)| {
                    (
                        name.as_str(),
                        PoolReport {
                            stats,
                            gold_rate: stats.gold_rate(),
                            avg_gold_interval: stats.avg_gold_interval(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Export the analysis to a pretty-printed JSON file.
pub fn export_to_json(export: &AnalysisExport<'_>, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(export).context("Failed to serialize analysis to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

/// Renders the analysis as a text report.
pub fn render_report(info: &RecordInfo, stats: &BTreeMap<String, PoolStats>, catalog: &Catalog) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);

    let total_pulls: u32 = stats.values().map(|s| s.total_pulls).sum();
    let total_gold: u32 = stats.values().map(|s| s.gold_count()).sum();
    let overall_rate = if total_pulls == 0 {
        0.0
    } else {
        total_gold as f64 / total_pulls as f64 * 100.0
    };

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  {} pull history report", info.game_name);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "UID: {}", info.uid);
    let _ = writeln!(out, "Exported: {}", info.export_time);
    let _ = writeln!(out);
    let _ = writeln!(out, "Overall:");
    let _ = writeln!(out, "  Total pulls: {}", total_pulls);
    let _ = writeln!(out, "  6-star count: {}", total_gold);
    let _ = writeln!(out, "  6-star rate: {:.2}%", overall_rate);

    let _ = writeln!(out);
    let _ = writeln!(out, "Per pool:");
    let _ = writeln!(out, "{}", thin);

    for (pool_name, pool) in stats {
        let pool_type = catalog
            .pool_by_name(pool_name)
            .map(|p| p.pool_type.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("unknown");

        let _ = writeln!(out);
        let _ = writeln!(out, "Pool: {} ({})", pool_name, pool_type);
        let _ = writeln!(out, "  Total pulls: {}", pool.total_pulls);
        let _ = writeln!(out, "  Rarity distribution:");
        for rarity in TRACKED_RARITIES {
            let _ = writeln!(
                out,
                "    {}-star: {}",
                rarity,
                pool.rarity_counts.get(&rarity).copied().unwrap_or(0)
            );
        }
        let _ = writeln!(
            out,
            "  Pity progress: {} pulls since last 6-star",
            pool.pity_progress
        );
        match pool.avg_gold_interval() {
            Some(avg) => {
                let intervals: Vec<String> =
                    pool.gold_intervals.iter().map(|n| n.to_string()).collect();
                let _ = writeln!(out, "  Gold intervals: {}", intervals.join(", "));
                let _ = writeln!(out, "  Average pulls per 6-star: {:.1}", avg);
                let _ = writeln!(out, "  6-star rate: {:.2}%", pool.gold_rate());
            }
            None => {
                let _ = writeln!(out, "  No 6-star obtained yet");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::statistics::analyze;
    use crate::logging::Logger;
    use crate::records::{RecordSet, test_entry, test_identity};
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn fixture() -> (RecordSet, Catalog) {
        let catalog: Catalog = serde_json::from_str(
            r#"{
                "item": {
                    "i1": {"display_name": "Gold Char", "rarity": 6},
                    "i2": {"display_name": "Common Char", "rarity": 3}
                },
                "pool": {
                    "p1": {"display_name": "Pool X", "pool_type": "standard"}
                }
            }"#,
        )
        .unwrap();

        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let entries = vec![
            test_entry("Gold Char", "Pool X", "2024-01-01 10:02:00"),
            test_entry("Common Char", "Pool X", "2024-01-01 10:01:00"),
            test_entry("Common Char", "Pool X", "2024-01-01 10:00:00"),
        ];
        let set = RecordSet::build(entries, &test_identity(), exported_at);
        (set, catalog)
    }

    #[test]
    fn test_render_report() {
        let logger = Logger::console_only();
        let (set, catalog) = fixture();
        let stats = analyze(&set, &catalog, &logger);

        let report = render_report(&set.info, &stats, &catalog);

        assert!(report.contains("UID: 1234567890"));
        assert!(report.contains("Total pulls: 3"));
        assert!(report.contains("Pool: Pool X (standard)"));
        assert!(report.contains("3-star: 2"));
        assert!(report.contains("6-star: 1"));
        assert!(report.contains("Gold intervals: 3"));
        assert!(report.contains("Average pulls per 6-star: 3.0"));
    }

    #[test]
    fn test_render_report_without_gold() {
        let logger = Logger::console_only();
        let (mut set, catalog) = fixture();
        set.data.retain(|e| e.item != "Gold Char");
        let stats = analyze(&set, &catalog, &logger);

        let report = render_report(&set.info, &stats, &catalog);

        assert!(report.contains("No 6-star obtained yet"));
        assert!(report.contains("6-star rate: 0.00%"));
    }

    #[test]
    fn test_export_to_json() {
        let logger = Logger::console_only();
        let (set, catalog) = fixture();
        let stats = analyze(&set, &catalog, &logger);

        let export = AnalysisExport::new(
            &set.info.game_id,
            &set.info.game_name,
            &set.info.uid,
            &stats,
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");
        export_to_json(&export, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"total_pulls\": 3"));
        assert!(content.contains("\"Pool X\""));
        assert!(content.contains("\"gold_intervals\""));
        assert!(content.contains("\"gold_rate\""));
        assert!(content.contains("\"avg_gold_interval\": 3.0"));
    }
}
