//! Assertions over merged pivot results.

use crate::grouping::GroupNumber;
use crate::reducers::QueryResult;

/// Assert that every row is exactly as wide as the result's columns.
///
/// # Panics
///
/// Panics on the first row of the wrong width.
pub fn assert_rows_match_schema(result: &QueryResult) {
    let width = result.columns.len();
    for (i, row) in result.rows.iter().enumerate() {
        assert_eq!(
            row.len(),
            width,
            "Row {i} has {} values but the schema has {width} columns:\n  Row: {row:?}",
            row.len()
        );
    }
}

/// Group numbers of every row, read from the `grouping_column` column.
///
/// # Panics
///
/// Panics if the column is missing or a row holds a non-integer marker.
#[must_use]
pub fn group_numbers(result: &QueryResult, grouping_column: &str) -> Vec<GroupNumber> {
    let idx = result
        .column_index(grouping_column)
        .unwrap_or_else(|| panic!("Result has no `{grouping_column}` column"));
    result
        .rows
        .iter()
        .map(|row| {
            row[idx]
                .as_u64()
                .unwrap_or_else(|| panic!("Non-integer group number in row {row:?}"))
        })
        .collect()
}

/// Assert that rows arrive in contiguous runs per group, in `expected` order.
///
/// # Panics
///
/// Panics if the sequence of distinct group numbers differs from `expected`
/// or a group reappears after another group started.
pub fn assert_group_sequence(result: &QueryResult, grouping_column: &str, expected: &[GroupNumber]) {
    let mut runs: Vec<GroupNumber> = group_numbers(result, grouping_column);
    runs.dedup();
    assert_eq!(
        runs, expected,
        "Group sequence mismatch:\n  Expected: {expected:?}\n  Actual runs: {runs:?}"
    );
}
