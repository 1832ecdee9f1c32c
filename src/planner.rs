// Rangeload - planner.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("number of segments must be positive")]
    InvalidSegmentCount,
}

/// Splits `[0, total_size)` into `count` contiguous half-open ranges.
///
/// `part = total_size / count`; segment `i` starts at `part * i` and every
/// segment except the last spans `part` bytes. The last segment ends at
/// `total_size`, absorbing the division remainder. When `count > total_size`
/// the non-final segments are zero-length; callers treat those as immediate
/// no-op completions.
pub fn plan(total_size: u64, count: u64) -> Result<Vec<(u64, u64)>, PlanError> {
    if count == 0 {
        return Err(PlanError::InvalidSegmentCount);
    }
    if total_size == 0 {
        return Ok(vec![(0, 0)]);
    }

    let part = total_size / count;
    let mut ranges = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = part * i;
        let end = if i == count - 1 { total_size } else { start + part };
        ranges.push((start, end));
    }
    Ok(ranges)
}
