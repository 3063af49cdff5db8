//! Pull-sequence statistics: per-pool pity counters, rarity distribution,
//! and gold-interval history.
//!
//! The pity counter is a plain accumulator: it grows by one on every pull in
//! the pool and resets to zero on a top-tier hit, at which point its value
//! is appended to the interval history. Whatever the counter holds after the
//! last entry is the pool's current unresolved streak.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Catalog;
use crate::logging::Logger;
use crate::records::RecordSet;

/// The top rarity tier; a hit resets the pity counter.
pub const GOLD_RARITY: u8 = 6;

/// Rarity tiers tracked in the per-pool distribution.
pub const TRACKED_RARITIES: std::ops::RangeInclusive<u8> = 2..=6;

#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub total_pulls: u32,
    /// Count per rarity tier; every tracked tier is present even when zero.
    pub rarity_counts: BTreeMap<u8, u32>,
    /// Pulls since the last top-tier hit (the current unresolved streak)
    pub pity_progress: u32,
    /// Pity-counter value at each top-tier hit, in chronological order
    pub gold_intervals: Vec<u32>,
}

impl PoolStats {
    fn new() -> Self {
        PoolStats {
            total_pulls: 0,
            rarity_counts: TRACKED_RARITIES.map(|r| (r, 0)).collect(),
            pity_progress: 0,
            gold_intervals: Vec::new(),
        }
    }

    pub fn gold_count(&self) -> u32 {
        self.rarity_counts.get(&GOLD_RARITY).copied().unwrap_or(0)
    }

    /// Top-tier rate in percent; 0 for an empty pool.
    pub fn gold_rate(&self) -> f64 {
        if self.total_pulls == 0 {
            0.0
        } else {
            self.gold_count() as f64 / self.total_pulls as f64 * 100.0
        }
    }

    /// Mean pulls per top-tier hit, `None` before the first one.
    pub fn avg_gold_interval(&self) -> Option<f64> {
        if self.gold_intervals.is_empty() {
            return None;
        }
        let sum: u32 = self.gold_intervals.iter().sum();
        Some(sum as f64 / self.gold_intervals.len() as f64)
    }
}

/// Walks the record set chronologically and computes per-pool statistics.
///
/// The input order is not trusted: record sets on disk are newest-first, so
/// entries are re-sorted ascending before the walk. Items missing from the
/// catalog count toward the pull total but land in no rarity bucket, with a
/// warning so catalog gaps stay visible.
pub fn analyze(set: &RecordSet, catalog: &Catalog, logger: &Logger) -> BTreeMap<String, PoolStats> {
    let mut entries = set.data.clone();
    entries.sort_by(|a, b| a.time.cmp(&b.time));

    let mut pools: BTreeMap<String, PoolStats> = BTreeMap::new();

    for entry in &entries {
        let rarity = match catalog.item_rarity(&entry.item) {
            Some(rarity) => rarity,
            None => {
                logger.warn(&format!("Item not in catalog: {}", entry.item));
                0
            }
        };

        let stats = pools
            .entry(entry.pool.clone())
            .or_insert_with(PoolStats::new);
        stats.total_pulls += 1;

        if TRACKED_RARITIES.contains(&rarity) {
            *stats.rarity_counts.entry(rarity).or_insert(0) += 1;
        } else if rarity != 0 {
            logger.warn(&format!(
                "Unexpected rarity {} for item: {}",
                rarity, entry.item
            ));
        }

        stats.pity_progress += 1;
        if rarity == GOLD_RARITY {
            stats.gold_intervals.push(stats.pity_progress);
            stats.pity_progress = 0;
        }
    }

    pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RecordSet, test_entry, test_identity};
    use chrono::{Local, TimeZone};

    fn catalog() -> Catalog {
        serde_json::from_str(
            r#"{
                "item": {
                    "i1": {"display_name": "Gold Char", "rarity": 6},
                    "i2": {"display_name": "Common Char", "rarity": 3},
                    "i3": {"display_name": "Odd Char", "rarity": 9}
                },
                "pool": {
                    "p1": {"display_name": "Pool X", "pool_type": "standard"}
                }
            }"#,
        )
        .unwrap()
    }

    fn set_with(entries: Vec<crate::records::PullEntry>) -> RecordSet {
        let exported_at = Local.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut set = RecordSet::build(Vec::new(), &test_identity(), exported_at);
        set.data = entries;
        set
    }

    fn sequence(items: &[&str]) -> RecordSet {
        // `items` is chronological; store newest-first like a real export
        let entries: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                test_entry(
                    item,
                    "Pool X",
                    &format!("2024-01-01 {:02}:{:02}:00", i / 60, i % 60),
                )
            })
            .rev()
            .collect();
        set_with(entries)
    }

    #[test]
    fn test_gold_intervals_and_pity_reset() {
        let logger = Logger::console_only();
        // 10 pulls with golds at the 5th and 10th
        let items = [
            "Common Char",
            "Common Char",
            "Common Char",
            "Common Char",
            "Gold Char",
            "Common Char",
            "Common Char",
            "Common Char",
            "Common Char",
            "Gold Char",
        ];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.total_pulls, 10);
        assert_eq!(pool.gold_intervals, vec![5, 5]);
        assert_eq!(pool.pity_progress, 0);
        assert_eq!(pool.gold_count(), 2);
        assert!((pool.gold_rate() - 20.0).abs() < 1e-9);
        assert_eq!(pool.avg_gold_interval(), Some(5.0));
    }

    #[test]
    fn test_no_gold_keeps_pity_running() {
        let logger = Logger::console_only();
        let items = ["Common Char"; 7];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.pity_progress, 7);
        assert!(pool.gold_intervals.is_empty());
        assert_eq!(pool.gold_rate(), 0.0);
        assert_eq!(pool.avg_gold_interval(), None);
    }

    #[test]
    fn test_trailing_streak_after_last_gold() {
        let logger = Logger::console_only();
        let items = ["Gold Char", "Common Char", "Common Char"];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.gold_intervals, vec![1]);
        assert_eq!(pool.pity_progress, 2);
    }

    #[test]
    fn test_rarity_distribution() {
        let logger = Logger::console_only();
        let items = ["Common Char", "Common Char", "Gold Char"];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.rarity_counts[&3], 2);
        assert_eq!(pool.rarity_counts[&6], 1);
        assert_eq!(pool.rarity_counts[&2], 0);
        assert_eq!(pool.rarity_counts[&4], 0);
        assert_eq!(pool.rarity_counts[&5], 0);
    }

    #[test]
    fn test_unknown_item_counts_as_pull_only() {
        let logger = Logger::console_only();
        let items = ["Mystery Char", "Common Char"];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.total_pulls, 2);
        // Unknown rarity lands in no bucket but still advances pity
        assert_eq!(pool.pity_progress, 2);
        assert_eq!(pool.rarity_counts.values().sum::<u32>(), 1);
    }

    #[test]
    fn test_out_of_range_rarity_is_not_counted() {
        let logger = Logger::console_only();
        let items = ["Odd Char"];
        let stats = analyze(&sequence(&items), &catalog(), &logger);
        let pool = &stats["Pool X"];

        assert_eq!(pool.total_pulls, 1);
        assert_eq!(pool.rarity_counts.values().sum::<u32>(), 0);
        assert_eq!(pool.pity_progress, 1);
    }

    #[test]
    fn test_pity_is_tracked_per_pool() {
        let logger = Logger::console_only();
        let stats = analyze(
            &set_with(vec![
                test_entry("Common Char", "Pool X", "2024-01-01 10:02:00"),
                test_entry("Gold Char", "Pool Y", "2024-01-01 10:01:00"),
                test_entry("Common Char", "Pool X", "2024-01-01 10:00:00"),
            ]),
            &catalog(),
            &logger,
        );

        assert_eq!(stats["Pool X"].pity_progress, 2);
        assert_eq!(stats["Pool Y"].pity_progress, 0);
        assert_eq!(stats["Pool Y"].gold_intervals, vec![1]);
    }
}
