//! Enumeration of the breakout subsets a pivot table needs.
//!
//! Given the base query's breakout count and the client's rows/columns split,
//! produce every subtotal and total level exactly once:
//!
//! 1. each proper prefix of the rows axis crossed with the full columns axis,
//! 2. the full rows axis on its own (row totals),
//! 3. each proper prefix of the rows axis on its own,
//! 4. the columns axis on its own,
//! 5. the empty set (grand total).
//!
//! Candidates are collapsed by set value and returned sorted by
//! [`group_number`] ascending.

use crate::error::{Axis, InvalidRequest, PivotError};
use crate::grouping::{BreakoutIndexSet, GroupNumber, MAX_BREAKOUTS, group_number};
use std::collections::BTreeMap;

/// Check both axes against the breakout count.
///
/// Rows are checked before columns; the first offending index is reported.
///
/// # Errors
///
/// Returns [`PivotError::InvalidRequest`] when the breakout count exceeds
/// [`MAX_BREAKOUTS`] or an axis index is `>= breakout_count`.
pub fn validate_axes(
    breakout_count: usize,
    rows: Option<&[usize]>,
    cols: Option<&[usize]>,
) -> Result<(), PivotError> {
    if breakout_count > MAX_BREAKOUTS {
        return Err(InvalidRequest::TooManyBreakouts {
            breakout_count,
            max: MAX_BREAKOUTS,
        }
        .into());
    }
    for (axis, indices) in [(Axis::Rows, rows), (Axis::Columns, cols)] {
        if let Some(&index) = indices
            .unwrap_or_default()
            .iter()
            .find(|&&i| i >= breakout_count)
        {
            return Err(PivotError::axis_out_of_range(axis, index, breakout_count));
        }
    }
    Ok(())
}

/// Enumerate the breakout subsets to query for, ordered by group number.
///
/// An absent or empty rows axis stands for every breakout in base-query order,
/// which yields one subtotal level per breakout prefix. An absent columns axis
/// is empty. An index may appear on both axes; the duplicate is dropped within
/// each subset, keeping its first position.
///
/// # Errors
///
/// Fails with [`PivotError::InvalidRequest`] before generating anything if an
/// axis index is out of range.
pub fn enumerate(
    breakout_count: usize,
    rows: Option<&[usize]>,
    cols: Option<&[usize]>,
) -> Result<Vec<BreakoutIndexSet>, PivotError> {
    validate_axes(breakout_count, rows, cols)?;

    let rows: BreakoutIndexSet = match rows {
        Some(r) if !r.is_empty() => r.to_vec(),
        _ => (0..breakout_count).collect(),
    };
    let cols: &[usize] = cols.unwrap_or_default();

    let mut candidates: Vec<BreakoutIndexSet> = Vec::new();
    let prefixes = 1..rows.len().saturating_sub(1) + 1;

    for i in prefixes.clone() {
        candidates.push(rows[..i].iter().chain(cols).copied().collect());
    }
    candidates.push(rows.clone());
    for i in prefixes {
        candidates.push(rows[..i].to_vec());
    }
    candidates.push(cols.to_vec());
    candidates.push(Vec::new());

    // Group numbers are a bijection on sets, so keying by them both
    // deduplicates by value and gives the final order.
    let mut by_group: BTreeMap<GroupNumber, BreakoutIndexSet> = BTreeMap::new();
    for candidate in candidates {
        let subset = dedup_indices(candidate);
        by_group
            .entry(group_number(breakout_count, &subset))
            .or_insert(subset);
    }
    Ok(by_group.into_values().collect())
}

fn dedup_indices(indices: BreakoutIndexSet) -> BreakoutIndexSet {
    let mut out = Vec::with_capacity(indices.len());
    for i in indices {
        if !out.contains(&i) {
            out.push(i);
        }
    }
    out
}
