//! Range-merging and subtraction primitives shared by the partitioner, the
//! dynamic-bin compressor, the peak caller and the track exporters.

use itertools::Itertools;

use crate::data_structs::typedef::{PosType, TrackValue};
use crate::data_structs::Interval;

/// Collapses strictly increasing member indices of a boolean mask into
/// maximal contiguous half-open ranges.
///
/// Adjacent indices differing by exactly one are merged; any larger gap
/// starts a new range. A single index yields one range of length one.
pub fn mask_to_ranges(mask_idx: &[PosType]) -> Vec<(PosType, PosType)> {
    if mask_idx.is_empty() {
        return Vec::new();
    }
    debug_assert!(
        mask_idx.windows(2).all(|w| w[0] < w[1]),
        "mask indices must be strictly increasing"
    );

    let mut ranges = Vec::new();
    let mut run_start = mask_idx[0];
    let mut prev = mask_idx[0];
    for &idx in &mask_idx[1..] {
        if idx != prev + 1 {
            ranges.push((run_start, prev + 1));
            run_start = idx;
        }
        prev = idx;
    }
    ranges.push((run_start, prev + 1));
    ranges
}

/// Subdivides each half-open range into consecutive chunks of at most
/// `bin_size`, aligned to the range's own start. The last chunk of each
/// range is truncated to the range end, never padded.
pub fn split_range_to_bins(
    ranges: &[(PosType, PosType)],
    bin_size: PosType,
) -> Vec<(PosType, PosType)> {
    assert!(bin_size > 0, "bin_size must be positive");
    let mut bins = Vec::new();
    for &(range_start, range_end) in ranges {
        let mut chunk_start = range_start;
        while chunk_start < range_end {
            let chunk_end = (chunk_start + bin_size).min(range_end);
            bins.push((chunk_start, chunk_end));
            chunk_start = chunk_end;
        }
    }
    bins
}

/// Subtracts margin-widened exclusions from `target`, returning the uncovered
/// remainder as zero or more sub-intervals.
///
/// Exclusions are sorted by start, each widened by `margin` on both sides
/// (saturating at zero), and swept left to right. The sweep short-circuits
/// once the cursor passes `target.end()`. A fully covered target yields an
/// empty result.
pub fn subtract_with_margin(
    target: &Interval,
    exclusions: &[Interval],
    margin: PosType,
) -> Vec<Interval> {
    let widened = exclusions
        .iter()
        .map(|ex| ex.widened(margin))
        .sorted_by_key(Interval::start)
        .collect_vec();

    let mut remaining = Vec::new();
    let mut cursor = target.start();
    for ex in widened {
        if ex.start() > cursor {
            let gap_end = ex.start().min(target.end());
            if gap_end > cursor {
                remaining.push(Interval::new(target.chrom().clone(), cursor, gap_end));
            }
        }
        cursor = cursor.max(ex.end());
        if cursor >= target.end() {
            break;
        }
    }
    if cursor < target.end() {
        remaining.push(Interval::new(
            target.chrom().clone(),
            cursor,
            target.end(),
        ));
    }
    remaining
}

/// Diff-to-RLE transform: collapses a dense array into `(start, end, value)`
/// runs at every change point. Shared by every dense-array exporter.
pub fn dense_to_runs<T: TrackValue>(values: &[T]) -> Vec<(PosType, PosType, T)> {
    let mut runs = Vec::new();
    if values.is_empty() {
        return runs;
    }
    let mut run_start = 0u64;
    let mut current = values[0];
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value != current {
            runs.push((run_start, idx as PosType, current));
            run_start = idx as PosType;
            current = value;
        }
    }
    runs.push((run_start, values.len() as PosType, current));
    runs
}
