//! Sequential executor that merges derived-query results into one stream.
//!
//! For each derived query, in plan order:
//!
//! 1. **Start** -- stop the run if cancellation has been signalled.
//! 2. **Describe** -- ask the engine for the query's columns and align them to
//!    the plan's expected schema.
//! 3. **Execute** -- run the query, reshaping each row with that alignment and
//!    feeding it to the reducer.
//! 4. **Advance** -- carry the accumulator to the next query.
//!
//! All rows of query *k* reach the reducer, in engine order, before any row of
//! query *k + 1*. Queries never run concurrently.
//!
//! The first query passes its rows through untouched when its columns already
//! line up with the expected schema; every later query is always reshaped.

use crate::align::ColumnMapping;
use crate::cancel::CancellationToken;
use crate::config::{ExecutionContext, PivotConfig};
use crate::engine::{ColumnMeta, QueryEngine, Row};
#[cfg(feature = "metrics")]
use crate::metrics::{self, MetricsCollector};
use crate::planner::{DerivedQuery, PivotPlan};
use crate::reducers::{RowReducer, RunStatus};
use anyhow::Result;
use tracing::{debug, info, trace};

/// Per-query row reshaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTransform {
    /// Rows already have the expected shape.
    PassThrough,
    Remap(ColumnMapping),
}

impl RowTransform {
    /// Transform for the query at `position` in the run.
    #[must_use]
    pub fn for_query(position: usize, expected: &[ColumnMeta], actual: &[ColumnMeta]) -> Self {
        let mapping = ColumnMapping::align(expected, actual);
        if position == 0 && mapping.is_identity(actual.len()) {
            Self::PassThrough
        } else {
            Self::Remap(mapping)
        }
    }

    #[must_use]
    pub fn apply(&self, row: Row) -> Row {
        match self {
            Self::PassThrough => row,
            Self::Remap(mapping) => mapping.apply(&row),
        }
    }
}

/// Drives a [`PivotPlan`] against an engine.
pub struct Runner<'e> {
    pub engine: &'e dyn QueryEngine,
    pub cancel: CancellationToken,
    #[cfg(feature = "metrics")]
    pub metrics: Option<MetricsCollector>,
    pub config: PivotConfig,
}

impl<'e> Runner<'e> {
    pub fn new(engine: &'e dyn QueryEngine) -> Self {
        Self::from_context(engine, ExecutionContext::default())
    }

    pub fn from_context(engine: &'e dyn QueryEngine, ctx: ExecutionContext) -> Self {
        Self {
            engine,
            cancel: ctx.cancel,
            #[cfg(feature = "metrics")]
            metrics: ctx.metrics,
            config: ctx.config,
        }
    }

    /// Execute every derived query in `plan` and reduce the merged rows.
    ///
    /// Cancellation is not an error: the reducer is completed with
    /// [`RunStatus::Cancelled`] and whatever was merged so far.
    ///
    /// # Errors
    ///
    /// The first error from the engine or from `reducer.step`; remaining
    /// queries are not run.
    pub fn run<A, O, R>(&self, plan: &PivotPlan, reducer: &R) -> Result<O>
    where
        R: RowReducer<A, O> + ?Sized,
    {
        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.record_start();
            m.increment_counter(metrics::QUERIES_PLANNED, plan.queries.len() as u64);
        }

        let mut acc = reducer.init(&plan.expected_schema);
        let mut status = RunStatus::Completed;
        let mut total_rows = 0u64;

        for (position, derived) in plan.queries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    executed = position,
                    remaining = plan.queries.len() - position,
                    "pivot run cancelled"
                );
                status = RunStatus::Cancelled;
                break;
            }
            total_rows +=
                self.run_one::<A, O, R>(position, derived, &plan.expected_schema, reducer, &mut acc)?;
        }

        if status == RunStatus::Completed && self.cancel.is_cancelled() {
            status = RunStatus::Cancelled;
        }

        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            if status == RunStatus::Cancelled {
                m.increment_counter(metrics::RUNS_CANCELLED, 1);
            }
            m.record_end();
        }

        debug!(rows = total_rows, ?status, "pivot run finished");
        Ok(reducer.complete(acc, status))
    }

    fn run_one<A, O, R>(
        &self,
        position: usize,
        derived: &DerivedQuery,
        expected: &[ColumnMeta],
        reducer: &R,
        acc: &mut A,
    ) -> Result<u64>
    where
        R: RowReducer<A, O> + ?Sized,
    {
        let actual = self.engine.describe_columns(&derived.query)?;
        let transform = RowTransform::for_query(position, expected, &actual);
        debug!(
            position,
            group = derived.group_number,
            columns = actual.len(),
            remapped = matches!(transform, RowTransform::Remap(_)),
            "running derived query"
        );

        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.increment_counter(metrics::QUERIES_EXECUTED, 1);
        }

        let progress_every = self.config.progress_log_interval.filter(|n| *n > 0);
        let mut emitted = 0u64;
        self.engine.execute(
            &derived.query,
            &mut |row: Row| {
                reducer.step(acc, transform.apply(row))?;
                emitted += 1;
                if progress_every.is_some_and(|n| emitted % n == 0) {
                    debug!(group = derived.group_number, rows = emitted, "pivot merge progress");
                }
                Ok(())
            },
            &self.cancel,
        )?;

        trace!(group = derived.group_number, rows = emitted, "derived query drained");
        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.increment_counter(metrics::ROWS_EMITTED, emitted);
        }
        Ok(emitted)
    }
}
