//! Fuzzy correction of OCR-recognized names against a known-valid catalog.
//!
//! An exact match is accepted as-is. Otherwise the candidate with the
//! smallest Levenshtein distance wins, provided the distance stays within
//! half the input length (see `DEFAULT_MAX_DISTANCE_RATIO`). Ties are broken
//! by catalog order, so correction is deterministic for a given name list.

use std::collections::HashSet;

use crate::logging::Logger;

/// Accept a correction when `distance <= floor(len(input) * ratio)`.
pub const DEFAULT_MAX_DISTANCE_RATIO: f64 = 0.5;

/// A valid-name catalog that preserves its configured order for tie-breaks
/// while keeping O(1) exact-membership checks.
#[derive(Debug, Clone)]
pub struct NameSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl NameSet {
    pub fn new(names: Vec<String>) -> Self {
        let members = names.iter().cloned().collect();
        NameSet {
            ordered: names,
            members,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|s| s.as_str())
    }
}

/// Outcome of correcting one recognized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub name: String,
    pub is_valid: bool,
}

/// Corrects a recognized name against the valid set.
///
/// Returns the original string with `is_valid = false` when no candidate is
/// close enough (or the set is empty); the caller routes those entries to
/// the error ledger.
pub fn correct_name(
    name: &str,
    valid_names: &NameSet,
    max_distance_ratio: f64,
    logger: &Logger,
) -> Correction {
    if valid_names.contains(name) {
        return Correction {
            name: name.to_string(),
            is_valid: true,
        };
    }

    let mut best: Option<(&str, usize)> = None;
    for candidate in valid_names.iter() {
        let distance = levenshtein(name, candidate);
        // Strict less-than keeps the first minimum in catalog order.
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }

    let max_distance = (name.chars().count() as f64 * max_distance_ratio).floor() as usize;

    match best {
        Some((candidate, distance)) if distance <= max_distance => Correction {
            name: candidate.to_string(),
            is_valid: true,
        },
        _ => {
            logger.warn(&format!("Could not correct name: {}", name));
            Correction {
                name: name.to_string(),
                is_valid: false,
            }
        }
    }
}

/// Levenshtein edit distance over Unicode scalar values, insert/delete/
/// substitute each costing 1. Single-row iterative relaxation.
pub fn levenshtein(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    // Keep the shorter string as the row
    let (longer, shorter) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    if shorter.is_empty() {
        return longer.len();
    }

    let mut previous_row: Vec<usize> = (0..=shorter.len()).collect();
    for (i, &c1) in longer.iter().enumerate() {
        let mut current_row = Vec::with_capacity(shorter.len() + 1);
        current_row.push(i + 1);
        for (j, &c2) in shorter.iter().enumerate() {
            let insertions = previous_row[j + 1] + 1;
            let deletions = current_row[j] + 1;
            let substitutions = previous_row[j] + usize::from(c1 != c2);
            current_row.push(insertions.min(deletions).min(substitutions));
        }
        previous_row = current_row;
    }

    previous_row[shorter.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_set(names: &[&str]) -> NameSet {
        NameSet::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn test_levenshtein_unicode_chars() {
        // One substitution regardless of byte width
        assert_eq!(levenshtein("银河", "银何"), 1);
        assert_eq!(levenshtein("Char A", "Char Ä"), 1);
    }

    #[test]
    fn test_exact_match_is_idempotent() {
        let logger = Logger::console_only();
        let valid = name_set(&["Char A", "Char B"]);
        let result = correct_name("Char A", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert_eq!(result.name, "Char A");
        assert!(result.is_valid);
    }

    #[test]
    fn test_close_name_is_corrected() {
        let logger = Logger::console_only();
        let valid = name_set(&["Char A", "Char B"]);
        // distance 1, threshold floor(6 * 0.5) = 3
        let result = correct_name("Char Ä", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert_eq!(result.name, "Char A");
        assert!(result.is_valid);
    }

    #[test]
    fn test_threshold_boundary() {
        let logger = Logger::console_only();
        let valid = name_set(&["abcdef"]);
        // input length 6 -> threshold 3
        // "abcxyz" is distance 3 from "abcdef": accepted
        let at = correct_name("abcxyz", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert!(at.is_valid);
        assert_eq!(at.name, "abcdef");
        // "abwxyz" is distance 4: rejected
        let over = correct_name("abwxyz", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert!(!over.is_valid);
        assert_eq!(over.name, "abwxyz");
    }

    #[test]
    fn test_tie_broken_by_catalog_order() {
        let logger = Logger::console_only();
        // "aax" is distance 1 from both; the first listed wins
        let valid = name_set(&["aab", "aac"]);
        let result = correct_name("aax", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert_eq!(result.name, "aab");
        assert!(result.is_valid);

        let reordered = name_set(&["aac", "aab"]);
        let result = correct_name("aax", &reordered, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert_eq!(result.name, "aac");
    }

    #[test]
    fn test_empty_candidate_set() {
        let logger = Logger::console_only();
        let valid = name_set(&[]);
        let result = correct_name("anything", &valid, DEFAULT_MAX_DISTANCE_RATIO, &logger);
        assert_eq!(result.name, "anything");
        assert!(!result.is_valid);
    }
}
