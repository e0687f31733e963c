//! Reducing functions that consume the merged row stream.
//!
//! A [`RowReducer`] has the same three-phase lifecycle as a single-query
//! result consumer: `init` once with the expected schema, `step` once per
//! merged row, and `complete` once at the end of the run (including a
//! cancelled run). The merger threads one accumulator through every derived
//! query, so the reducer sees a single logical stream.

use crate::engine::{ColumnMeta, Row};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// How a pivot run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped by the cancellation token; the accumulator holds what was
    /// merged so far.
    Cancelled,
}

/// Reducer over merged rows with accumulator `A` and output `O`.
pub trait RowReducer<A, O> {
    fn init(&self, columns: &[ColumnMeta]) -> A;

    /// # Errors
    ///
    /// An error aborts the run and is returned to the caller.
    fn step(&self, acc: &mut A, row: Row) -> Result<()>;

    fn complete(&self, acc: A, status: RunStatus) -> O;
}

/// Result of a pivot run, shaped like a single-query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub status: RunStatus,
}

impl QueryResult {
    /// Position of the column called `name` in [`columns`](Self::columns).
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Collects every merged row into a [`QueryResult`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CollectRows;

impl RowReducer<QueryResult, QueryResult> for CollectRows {
    fn init(&self, columns: &[ColumnMeta]) -> QueryResult {
        QueryResult {
            columns: columns.to_vec(),
            rows: Vec::new(),
            row_count: 0,
            status: RunStatus::Completed,
        }
    }

    fn step(&self, acc: &mut QueryResult, row: Row) -> Result<()> {
        acc.rows.push(row);
        Ok(())
    }

    fn complete(&self, mut acc: QueryResult, status: RunStatus) -> QueryResult {
        acc.row_count = acc.rows.len();
        acc.status = status;
        acc
    }
}

/// Counts merged rows without keeping them.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountRows;

impl RowReducer<u64, (u64, RunStatus)> for CountRows {
    fn init(&self, _columns: &[ColumnMeta]) -> u64 {
        0
    }

    fn step(&self, acc: &mut u64, _row: Row) -> Result<()> {
        *acc += 1;
        Ok(())
    }

    fn complete(&self, acc: u64, status: RunStatus) -> (u64, RunStatus) {
        (acc, status)
    }
}
