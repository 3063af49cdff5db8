//! Parses raw OCR text lines into positional record entries.
//!
//! A history-table row reads like `Char A | Pool X | 2024-01-01 10:00:00`.
//! The timestamp anchors the parse: everything to its left is split into
//! columns, and the configured indices pick out the item and pool fields.

use anyhow::Result;
use regex::Regex;

use crate::config::ColumnIndices;
use crate::logging::Logger;

/// Timestamp patterns, most specific first. The first match in a line wins.
const DATE_PATTERNS: [&str; 3] = [
    r"\d{4}[-/]\d{1,2}[-/]\d{1,2}[ T]\d{1,2}:\d{2}:\d{2}",
    r"\d{4}[-/]\d{1,2}[-/]\d{1,2}[ T]\d{1,2}:\d{2}",
    r"\d{4}[-/]\d{1,2}[-/]\d{1,2}",
];

/// Characters trimmed from around the field section of a line.
const FIELD_TRIM: &[char] = &[' ', '|', ',', '-', '\t'];

/// One entry as recognized, before any cleaning or correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub item: String,
    pub pool: String,
    pub time: String,
}

pub struct LineParser {
    patterns: Vec<Regex>,
    whitespace_split: Regex,
    columns: ColumnIndices,
}

impl LineParser {
    pub fn new(columns: ColumnIndices) -> Result<Self> {
        let patterns = DATE_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LineParser {
            patterns,
            whitespace_split: Regex::new(r"\s{2,}")?,
            columns,
        })
    }

    /// Parses one line of OCR text. Returns None when no timestamp is found
    /// (header rows, noise, empty lines).
    pub fn parse_line(&self, line: &str) -> Option<RawEntry> {
        let ts_match = self
            .patterns
            .iter()
            .find_map(|pattern| pattern.find(line))?;

        let left_part = line[..ts_match.start()].trim_matches(FIELD_TRIM);
        let parts: Vec<&str> = if left_part.contains('|') {
            left_part.split('|').map(str::trim).collect()
        } else {
            self.whitespace_split.split(left_part).collect()
        };

        // An out-of-range column yields an empty field, not an error; the
        // cleaner will flag it as invalid downstream.
        let field = |index: usize| parts.get(index).map_or("", |p| p.trim()).to_string();

        Some(RawEntry {
            item: field(self.columns.item),
            pool: field(self.columns.pool),
            time: ts_match.as_str().to_string(),
        })
    }

    /// Parses a whole OCR text block, skipping lines without a timestamp.
    pub fn parse_text(&self, ocr_text: &str, logger: &Logger) -> Vec<RawEntry> {
        let entries: Vec<RawEntry> = ocr_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| self.parse_line(line))
            .collect();
        logger.info(&format!("Parsed {} entries from OCR text", entries.len()));
        entries
    }
}
