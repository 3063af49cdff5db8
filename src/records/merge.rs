//! Merging overlapping record sets from successive exports.
//!
//! Screenshots are taken in overlapping batches, so the same pulls reappear
//! across exports in a stable order. A run of at least `MIN_OVERLAP_RUN`
//! consecutive identical `(time, pool, item)` triples is taken as the true
//! overlap between two sets; single-entry collisions are too common with
//! generic item names to trust. The first qualifying run wins, and the
//! longer prefix/suffix on either side of it is kept as the more complete
//! one. Entries outside the overlap window are never unioned.

use thiserror::Error;

use super::{PullEntry, RecordInfo, RecordSet};

/// Minimum consecutive matching entries to accept an overlap.
pub const MIN_OVERLAP_RUN: usize = 3;

/// Identity fields that must match for two sets to describe the same
/// account history.
const IDENTITY_KEYS: [&str; 4] = ["game_id", "uid", "timezone", "lang"];

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("record sets disagree on {key}: {left:?} vs {right:?}")]
    IncompatibleSets {
        key: &'static str,
        left: String,
        right: String,
    },
    #[error("no run of {min_run} or more overlapping entries found")]
    NoOverlapFound { min_run: usize },
}

/// Checks the identity tuple (game_id, uid, timezone, lang). Errors on the
/// first key that differs.
pub fn check_compatibility(a: &RecordInfo, b: &RecordInfo) -> Result<(), MergeError> {
    let pairs = [
        (a.game_id.clone(), b.game_id.clone()),
        (a.uid.clone(), b.uid.clone()),
        (a.timezone.to_string(), b.timezone.to_string()),
        (a.lang.clone(), b.lang.clone()),
    ];
    for (key, (left, right)) in IDENTITY_KEYS.into_iter().zip(pairs) {
        if left != right {
            return Err(MergeError::IncompatibleSets { key, left, right });
        }
    }
    Ok(())
}

/// Half-open index ranges of the overlap in each sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlap {
    start_a: usize,
    end_a: usize,
    start_b: usize,
    end_b: usize,
}

fn entries_match(a: &PullEntry, b: &PullEntry) -> bool {
    a.time == b.time && a.pool == b.pool && a.item == b.item
}

/// Scans all index pairs in ascending order and accepts the first run of
/// `MIN_OVERLAP_RUN` or more matching entries. Deliberately does not keep
/// searching for a longer run.
fn find_overlap(data_a: &[PullEntry], data_b: &[PullEntry]) -> Option<Overlap> {
    for i in 0..data_a.len() {
        for j in 0..data_b.len() {
            if !entries_match(&data_a[i], &data_b[j]) {
                continue;
            }
            let mut k = 0;
            while i + k < data_a.len()
                && j + k < data_b.len()
                && entries_match(&data_a[i + k], &data_b[j + k])
            {
                k += 1;
            }
            if k >= MIN_OVERLAP_RUN {
                return Some(Overlap {
                    start_a: i,
                    end_a: i + k,
                    start_b: j,
                    end_b: j + k,
                });
            }
        }
    }
    None
}

/// Merges two record sets covering the same account.
///
/// Both sequences must run in the same chronological direction. The result
/// keeps set A's copy of the overlap window, the longer of the two prefixes
/// before it, and the longer of the two suffixes after it. The `info` block
/// comes from whichever set was exported later.
pub fn merge(set_a: &RecordSet, set_b: &RecordSet) -> Result<RecordSet, MergeError> {
    check_compatibility(&set_a.info, &set_b.info)?;

    let overlap = find_overlap(&set_a.data, &set_b.data).ok_or(MergeError::NoOverlapFound {
        min_run: MIN_OVERLAP_RUN,
    })?;

    let before_a = &set_a.data[..overlap.start_a];
    let shared = &set_a.data[overlap.start_a..overlap.end_a];
    let after_a = &set_a.data[overlap.end_a..];
    let before_b = &set_b.data[..overlap.start_b];
    let after_b = &set_b.data[overlap.end_b..];

    let before = if before_a.len() > before_b.len() {
        before_a
    } else {
        before_b
    };
    let after = if after_a.len() > after_b.len() {
        after_a
    } else {
        after_b
    };

    let mut data = Vec::with_capacity(before.len() + shared.len() + after.len());
    data.extend_from_slice(before);
    data.extend_from_slice(shared);
    data.extend_from_slice(after);

    let mut info = if set_b.info.export_timestamp > set_a.info.export_timestamp {
        set_b.info.clone()
    } else {
        set_a.info.clone()
    };
    info.total_entries = data.len();

    Ok(RecordSet { info, data })
}
