//! # Ironpivot
//!
//! A **pivot-table query planner** and **result-stream merger** that sits in
//! front of a generic query engine. Given one analytical base query and a
//! client's rows/columns split of its breakouts, Ironpivot works out every
//! subtotal and total level the pivot grid needs, rewrites the base query once
//! per level, runs the rewritten queries in a fixed order, and merges their
//! differently-shaped rows into a single stream with one schema.
//!
//! ## Quick Start
//!
//! ```
//! use ironpivot::*;
//! use ironpivot::testing::fixtures;
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = fixtures::sales_engine();
//!
//! // state, source, category; rows = [state, source], cols = [category]
//! let request = PivotRequest::new(fixtures::sales_query())
//!     .with_rows(vec![0, 1])
//!     .with_cols(vec![2]);
//!
//! let result = run_pivot_query(&engine, &request, None, None)?;
//! assert!(result.rows.iter().all(|r| r.len() == result.columns.len()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Group numbers
//!
//! Each derived query carries a synthetic `pivot-grouping` column holding its
//! [`GroupNumber`]: a bitmask with bit `i` set when breakout `i` is *absent*.
//! The detail level is `0` and the grand total is `2^N - 1`, matching a
//! relational `GROUPING()` call.
//!
//! ### Combinations
//!
//! [`enumerate`] lists the breakout subsets to query: row-prefix subtotals
//! crossed with the column breakouts, row totals, row-prefix subtotals alone,
//! column totals and the grand total, deduplicated and sorted by group number.
//!
//! ### Planning
//!
//! [`build_plan`] validates the axes, rewrites the base query per subset, and
//! describes the full-breakout *schema query* to learn the expected schema.
//! [`PivotPlan::explain`] renders what will run.
//!
//! ### Merging
//!
//! [`Runner`] executes the derived queries one at a time. Each query's columns
//! are aligned to the expected schema by name when it starts; missing columns
//! are filled with `null`. Rows are fed to a [`RowReducer`] in order, and a
//! [`CancellationToken`] is checked between queries.
//!
//! ## Module Overview
//!
//! - [`grouping`] - group-number bitmasks
//! - [`combinations`] - subtotal/total subset enumeration
//! - [`query`] - the structured query model
//! - [`rewrite`] - derived-query construction
//! - [`request`] - pivot requests and normalization
//! - [`planner`] - plan building and explanation
//! - [`align`] - column alignment onto the expected schema
//! - [`runner`] - the sequential merge driver
//! - [`reducers`] - reducing functions over merged rows
//! - [`engine`] - the query engine seam
//! - [`metrics`] - run metrics (feature `metrics`)
//! - [`testing`] - in-memory engine, fixtures and assertions

pub mod align;
pub mod cancel;
pub mod combinations;
pub mod config;
pub mod engine;
pub mod error;
pub mod grouping;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod pivot;
pub mod planner;
pub mod query;
pub mod reducers;
pub mod request;
pub mod rewrite;
pub mod runner;
pub mod testing;

// General re-exports
pub use align::ColumnMapping;
pub use cancel::CancellationToken;
pub use combinations::enumerate;
pub use config::{ExecutionContext, PivotConfig};
pub use engine::{ColumnMeta, ColumnSource, QueryEngine, Row};
pub use error::{Axis, InvalidRequest, PivotError};
pub use grouping::{BreakoutIndexSet, GroupNumber, group_number};
pub use pivot::{run_pivot_json, run_pivot_query, run_pivot_query_with};
pub use planner::{
    DerivedQuery, ExplainStep, GeneratedQueries, PivotPlan, PlanDecision, PlanExplanation,
    build_plan, generate_queries,
};
pub use query::{Aggregation, Breakout, Expression, Query, QueryBuilder};
pub use reducers::{CollectRows, CountRows, QueryResult, RowReducer, RunStatus};
pub use request::{PivotRequest, RequestInfo, normalize};
pub use rewrite::{DEFAULT_GROUPING_COLUMN, rewrite};
pub use runner::{RowTransform, Runner};
