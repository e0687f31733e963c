//! Canonical group numbers for breakout subsets.
//!
//! A group number is a bitmask over the base query's breakouts where bit `i`
//! is **set** when breakout `i` is *absent* from a derived query, matching the
//! value a relational `GROUPING(b0, b1, ...)` call reports for the same row
//! (read with `b0` as the least significant bit). The full subset is therefore
//! always `0` and the empty subset is always `2^N - 1`.

/// Bitmask identifying which breakouts survive in a derived query.
pub type GroupNumber = u64;

/// Positions into the base query's breakout list, in the order they are listed.
pub type BreakoutIndexSet = Vec<usize>;

/// The widest breakout list whose group numbers fit in a [`GroupNumber`]
/// and in the signed literal the grouping marker carries.
pub const MAX_BREAKOUTS: usize = 63;

/// Mask with every breakout marked absent.
#[must_use]
pub fn all_absent(breakout_count: usize) -> GroupNumber {
    if breakout_count >= 64 {
        GroupNumber::MAX
    } else {
        (1 << breakout_count) - 1
    }
}

/// Group number for `indices` in a query with `breakout_count` breakouts.
///
/// Starts from [`all_absent`] and clears the bit of every present breakout, so
/// the result depends only on the *set* of indices: listing order and repeats
/// do not matter. Indices that do not fit in the mask are ignored; callers
/// validate them beforehand.
#[must_use]
pub fn group_number(breakout_count: usize, indices: &[usize]) -> GroupNumber {
    indices.iter().fold(all_absent(breakout_count), |acc, &i| {
        let bit = u32::try_from(i)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .unwrap_or(0);
        acc & !bit
    })
}

/// Indices of the breakouts a group number marks as present.
#[must_use]
pub fn present_indices(breakout_count: usize, group: GroupNumber) -> BreakoutIndexSet {
    (0..breakout_count.min(64))
        .filter(|i| group & (1 << i) == 0)
        .collect()
}
