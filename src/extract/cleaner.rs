//! Cleans and corrects raw entries into validated pull records.
//!
//! Cleaning runs in a fixed order: strip configured prefix/suffix patterns,
//! fuzzy-correct both names against the catalogs, normalize the timestamp,
//! and route anything still invalid to the error ledger. Entries whose
//! timestamp cannot be repaired are dropped outright; a pull without a time
//! cannot be placed in the history sequence.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::correct::{DEFAULT_MAX_DISTANCE_RATIO, NameSet, correct_name};
use super::parser::RawEntry;
use crate::config::TextProcessing;
use crate::ledger::{ErrorContext, ErrorLedger};
use crate::logging::Logger;
use crate::records::PullEntry;

/// Canonical on-disk timestamp format.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub struct EntryCleaner<'a> {
    enable_clean_name: bool,
    prefix_patterns: Vec<Regex>,
    suffix_patterns: Vec<Regex>,
    valid_items: &'a NameSet,
    valid_pools: &'a NameSet,
}

impl<'a> EntryCleaner<'a> {
    pub fn new(
        text_processing: &TextProcessing,
        valid_items: &'a NameSet,
        valid_pools: &'a NameSet,
    ) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(Into::into))
                .collect()
        };
        Ok(EntryCleaner {
            enable_clean_name: text_processing.enable_clean_name,
            prefix_patterns: compile(&text_processing.patterns.prefix_patterns)?,
            suffix_patterns: compile(&text_processing.patterns.suffix_patterns)?,
            valid_items,
            valid_pools,
        })
    }

    /// Cleans one raw entry. Returns None when the timestamp cannot be
    /// normalized; name problems alone never drop an entry, they mark it
    /// invalid and record it in the ledger.
    pub fn clean_entry(
        &self,
        raw: RawEntry,
        ledger: Option<&ErrorLedger>,
        source: Option<&str>,
        position: usize,
        logger: &Logger,
    ) -> Option<PullEntry> {
        let (item, pool) = if self.enable_clean_name {
            (self.strip_patterns(&raw.item), self.strip_patterns(&raw.pool))
        } else {
            (raw.item, raw.pool)
        };

        let item_result = correct_name(&item, self.valid_items, DEFAULT_MAX_DISTANCE_RATIO, logger);
        let pool_result = correct_name(&pool, self.valid_pools, DEFAULT_MAX_DISTANCE_RATIO, logger);
        let is_valid = item_result.is_valid && pool_result.is_valid;

        let time = repair_timestamp(&raw.time);

        if !is_valid {
            if let Some(ledger) = ledger {
                let context = ErrorContext {
                    source: source.map(str::to_string),
                    position: Some(position),
                    record_path: None,
                };
                if let Err(e) = ledger.record(
                    &item_result,
                    &pool_result,
                    time.as_deref(),
                    context,
                ) {
                    logger.error(&format!("Failed to record error entry: {:#}", e));
                }
            }
        }

        match time {
            Some(time) => Some(PullEntry {
                item: item_result.name,
                pool: pool_result.name,
                time,
                is_valid,
            }),
            None => {
                logger.warn(&format!(
                    "Skipping entry with unparseable time: {} / {} / {}",
                    item_result.name, pool_result.name, raw.time
                ));
                None
            }
        }
    }

    fn strip_patterns(&self, name: &str) -> String {
        let mut cleaned = name.to_string();
        for pattern in self.prefix_patterns.iter().chain(&self.suffix_patterns) {
            cleaned = pattern.replace_all(&cleaned, "").trim().to_string();
        }
        cleaned
    }
}

/// Repairs an OCR-mangled timestamp into `YYYY-MM-DD HH:MM:SS`.
///
/// Separators are normalized first (`T` to space, `.` and `/` to `-`, CJK
/// date units to `-`, everything outside digits/dash/colon/space removed),
/// then the format templates are tried in order. Date-only values default
/// the time to midnight. Returns None when nothing parses.
pub fn repair_timestamp(ts: &str) -> Option<String> {
    if ts.trim().is_empty() {
        return None;
    }

    let normalized: String = ts
        .trim()
        .chars()
        .map(|c| match c {
            'T' => ' ',
            '.' | '/' => '-',
            '年' | '月' | '日' => '-',
            other => other,
        })
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | ':' | ' '))
        .collect();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.format(TIME_FORMAT).to_string());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, fmt) {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(midnight.format(TIME_FORMAT).to_string());
        }
    }

    None
}
