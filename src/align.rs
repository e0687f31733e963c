//! Align a derived query's columns onto the expected schema.

use crate::engine::{ColumnMeta, Row};
use serde_json::Value;

/// For each expected column, the position of the matching column in one
/// derived query's output, or `None` when that query does not produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    positions: Vec<Option<usize>>,
}

impl ColumnMapping {
    /// Match every expected column to the first actual column with the same
    /// name.
    ///
    /// When `actual` repeats a name the first occurrence wins. That choice is
    /// stable but callers should not depend on which duplicate is picked.
    #[must_use]
    pub fn align(expected: &[ColumnMeta], actual: &[ColumnMeta]) -> Self {
        let positions = expected
            .iter()
            .map(|want| actual.iter().position(|col| col.name == want.name))
            .collect();
        Self { positions }
    }

    #[must_use]
    pub fn identity(width: usize) -> Self {
        Self {
            positions: (0..width).map(Some).collect(),
        }
    }

    /// True when rows `source_width` wide already have the expected shape.
    #[must_use]
    pub fn is_identity(&self, source_width: usize) -> bool {
        self.positions.len() == source_width
            && self
                .positions
                .iter()
                .enumerate()
                .all(|(i, p)| *p == Some(i))
    }

    #[must_use]
    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    /// Width of remapped rows.
    #[must_use]
    pub fn width(&self) -> usize {
        self.positions.len()
    }

    /// Number of expected columns this query does not produce.
    #[must_use]
    pub fn absent_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }

    /// Reshape `row` to the expected schema.
    ///
    /// Absent columns, and positions past the end of a short row, become `null`.
    #[must_use]
    pub fn apply(&self, row: &[Value]) -> Row {
        self.positions
            .iter()
            .map(|p| p.and_then(|i| row.get(i)).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
