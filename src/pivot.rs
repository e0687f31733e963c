//! Caller-facing entry points.

use crate::config::ExecutionContext;
use crate::engine::QueryEngine;
use crate::planner::build_plan;
use crate::reducers::{CollectRows, QueryResult, RowReducer};
use crate::request::{PivotRequest, RequestInfo, normalize};
use crate::runner::Runner;
use anyhow::Result;
use serde_json::Value;
use tracing::debug;

/// Plan `request`, run every derived query, and collect the merged rows.
///
/// The result has the same shape as a single-query result: `columns` is the
/// expected schema and every row in `rows` has exactly that width.
///
/// # Errors
///
/// - An invalid-request [`PivotError`](crate::PivotError) for bad axis indices,
///   raised before anything runs.
/// - A query-generation [`PivotError`](crate::PivotError) if the base query
///   cannot be rewritten.
/// - Any engine error, unchanged.
pub fn run_pivot_query(
    engine: &dyn QueryEngine,
    request: &PivotRequest,
    info: Option<RequestInfo>,
    context: Option<ExecutionContext>,
) -> Result<QueryResult> {
    run_pivot_query_with(engine, request, info, context, &CollectRows)
}

/// Like [`run_pivot_query`], streaming merged rows into `reducer` instead.
///
/// # Errors
///
/// See [`run_pivot_query`]; errors from `reducer.step` are returned as well.
pub fn run_pivot_query_with<A, O, R>(
    engine: &dyn QueryEngine,
    request: &PivotRequest,
    info: Option<RequestInfo>,
    context: Option<ExecutionContext>,
    reducer: &R,
) -> Result<O>
where
    R: RowReducer<A, O> + ?Sized,
{
    let ctx = context.unwrap_or_default();
    let plan = build_plan(engine, request, info.as_ref(), &ctx.config)?;
    debug!(
        context = info.as_ref().and_then(|i| i.context.as_deref()),
        queries = plan.queries.len(),
        "starting pivot run"
    );
    Runner::from_context(engine, ctx).run(&plan, reducer)
}

/// Normalize a raw JSON request and run it with [`run_pivot_query`].
///
/// # Errors
///
/// An invalid-request [`PivotError`](crate::PivotError) if `raw` is not a
/// pivot request, then everything [`run_pivot_query`] reports.
pub fn run_pivot_json(
    engine: &dyn QueryEngine,
    raw: Value,
    info: Option<RequestInfo>,
    context: Option<ExecutionContext>,
) -> Result<QueryResult> {
    let request = normalize(raw)?;
    run_pivot_query(engine, &request, info, context)
}
