//! Pivot query planner.
//!
//! The planner turns one [`PivotRequest`] into:
//!
//! 1. a **schema query** -- the base query with every breakout plus the grouping
//!    marker at group number `0` -- whose described columns become the
//!    expected schema every merged row must match, and
//! 2. an ordered list of **derived queries**, one per breakout subset produced
//!    by [`enumerate`](crate::combinations::enumerate), each tagged with its
//!    canonical group number.
//!
//! Axis validation happens before any query is built. Failures while rewriting
//! the base query are reported as a single
//! [`PivotError::QueryGeneration`] carrying the offending query.

use crate::combinations::enumerate;
use crate::config::PivotConfig;
use crate::engine::{ColumnMeta, QueryEngine};
use crate::error::{InvalidRequest, PivotError};
use crate::grouping::{BreakoutIndexSet, GroupNumber, group_number};
use crate::query::{Breakout, Query};
use crate::request::{PivotRequest, RequestInfo};
use crate::rewrite::rewrite;
use anyhow::{Context, Result};
use std::fmt::{Display, Formatter, Result as FormatResult};
use tracing::debug;

/// One rewritten copy of the base query.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuery {
    pub group_number: GroupNumber,
    /// Base-query breakout positions kept, in derived-query order.
    pub breakout_indices: BreakoutIndexSet,
    pub query: Query,
}

/// Queries generated for a request, before the expected schema is known.
#[derive(Debug, Clone)]
pub struct GeneratedQueries {
    pub breakout_count: usize,
    pub schema_query: Query,
    pub queries: Vec<DerivedQuery>,
    pub decisions: Vec<PlanDecision>,
}

/// A finalized plan: the expected schema plus the derived queries in run order.
#[derive(Debug, Clone)]
pub struct PivotPlan {
    pub breakout_count: usize,
    pub schema_query: Query,
    pub expected_schema: Vec<ColumnMeta>,
    pub queries: Vec<DerivedQuery>,
    pub decisions: Vec<PlanDecision>,
}

/// Noteworthy choices the planner made for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    /// No rows axis was given, so every breakout was used in base order.
    DefaultedRowsAxis { breakout_count: usize },
    /// Some generated combinations described the same breakout set.
    CollapsedCombinations { candidates: usize, unique: usize },
}

/// Rewrite `request` into the schema query and the ordered derived queries.
///
/// This is pure; no engine is consulted.
///
/// # Errors
///
/// - [`PivotError::InvalidRequest`] when an axis index is out of range or the
///   query has too many breakouts.
/// - [`PivotError::QueryGeneration`] when the base query cannot be rewritten.
pub fn generate_queries(
    request: &PivotRequest,
    info: Option<&RequestInfo>,
    config: &PivotConfig,
) -> Result<GeneratedQueries> {
    let base = &request.query;
    let breakouts: Vec<Breakout> = base
        .breakouts()
        .map_err(|e| PivotError::query_generation(base, e))?
        .to_vec();
    let breakout_count = breakouts.len();

    let limit = config.breakout_limit();
    if breakout_count > limit {
        return Err(PivotError::from(InvalidRequest::TooManyBreakouts {
            breakout_count,
            max: limit,
        })
        .into());
    }
    let subsets = enumerate(breakout_count, request.rows(), request.cols())?;

    let build = |subset: &[usize], group: GroupNumber| -> Result<Query> {
        let kept = subset.iter().map(|&i| breakouts[i].clone()).collect();
        let mut derived = rewrite(base, kept, group, &config.grouping_column)?;
        if let Some(info) = info {
            derived.info = Some(info.clone());
        }
        Ok(derived)
    };

    let generate = || -> Result<(Query, Vec<DerivedQuery>)> {
        let all: BreakoutIndexSet = (0..breakout_count).collect();
        let schema_query = build(&all, 0).context("building the schema query")?;
        let queries = subsets
            .iter()
            .map(|subset| {
                let group = group_number(breakout_count, subset);
                let query = build(subset, group)
                    .with_context(|| format!("building the query for group {group}"))?;
                Ok(DerivedQuery {
                    group_number: group,
                    breakout_indices: subset.clone(),
                    query,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((schema_query, queries))
    };
    let (schema_query, queries) = generate().map_err(|e| PivotError::query_generation(base, e))?;

    let mut decisions = Vec::new();
    if request.rows().is_none_or(<[usize]>::is_empty) {
        decisions.push(PlanDecision::DefaultedRowsAxis { breakout_count });
    }
    let rows_len = request
        .rows()
        .filter(|r| !r.is_empty())
        .map_or(breakout_count, <[usize]>::len);
    let candidates = 2 * rows_len.saturating_sub(1) + 3;
    if candidates > queries.len() {
        decisions.push(PlanDecision::CollapsedCombinations {
            candidates,
            unique: queries.len(),
        });
    }

    Ok(GeneratedQueries {
        breakout_count,
        schema_query,
        queries,
        decisions,
    })
}

/// Generate the derived queries and describe the schema query.
///
/// # Errors
///
/// Everything [`generate_queries`] reports, plus any error the engine returns
/// while describing the schema query (unchanged).
pub fn build_plan(
    engine: &dyn QueryEngine,
    request: &PivotRequest,
    info: Option<&RequestInfo>,
    config: &PivotConfig,
) -> Result<PivotPlan> {
    let generated = generate_queries(request, info, config)?;
    let expected_schema = engine.describe_columns(&generated.schema_query)?;
    debug!(
        breakout_count = generated.breakout_count,
        queries = generated.queries.len(),
        schema_width = expected_schema.len(),
        "pivot plan built"
    );
    Ok(PivotPlan {
        breakout_count: generated.breakout_count,
        schema_query: generated.schema_query,
        expected_schema,
        queries: generated.queries,
        decisions: generated.decisions,
    })
}

/// Human-readable summary of a [`PivotPlan`].
#[derive(Debug, Clone)]
pub struct PlanExplanation {
    pub breakout_count: usize,
    pub schema_columns: Vec<String>,
    pub steps: Vec<ExplainStep>,
    pub decisions: Vec<PlanDecision>,
}

/// One derived query in run order.
#[derive(Debug, Clone)]
pub struct ExplainStep {
    pub step: usize,
    pub group_number: GroupNumber,
    pub present: BreakoutIndexSet,
    pub absent: BreakoutIndexSet,
    /// Short label: `detail`, `subtotal` or `grand total`.
    pub level: &'static str,
}

impl PivotPlan {
    /// Describe what the plan will run.
    #[must_use]
    pub fn explain(&self) -> PlanExplanation {
        let n = self.breakout_count;
        let steps = self
            .queries
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let absent = (0..n)
                    .filter(|i| !q.breakout_indices.contains(i))
                    .collect::<Vec<_>>();
                let level = if absent.is_empty() {
                    "detail"
                } else if q.breakout_indices.is_empty() {
                    "grand total"
                } else {
                    "subtotal"
                };
                ExplainStep {
                    step: idx + 1,
                    group_number: q.group_number,
                    present: q.breakout_indices.clone(),
                    absent,
                    level,
                }
            })
            .collect();

        PlanExplanation {
            breakout_count: n,
            schema_columns: self.expected_schema.iter().map(|c| c.name.clone()).collect(),
            steps,
            decisions: self.decisions.clone(),
        }
    }
}

impl Display for PlanExplanation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        writeln!(
            f,
            "╔═══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                 PIVOT PLAN EXPLANATION                        ║"
        )?;
        writeln!(
            f,
            "╚═══════════════════════════════════════════════════════════════╝"
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "┌─ EXPECTED SCHEMA ────────────────────────────────────────────┐"
        )?;
        writeln!(f, "│ Breakouts:         {:>10}", self.breakout_count)?;
        writeln!(f, "│ Columns:           {:>10}", self.schema_columns.len())?;
        writeln!(f, "│   {}", self.schema_columns.join(", "))?;
        writeln!(
            f,
            "└──────────────────────────────────────────────────────────────┘"
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "┌─ DERIVED QUERIES ────────────────────────────────────────────┐"
        )?;
        for step in &self.steps {
            writeln!(f, "│")?;
            writeln!(
                f,
                "│ Step {}: group {} [{}]",
                step.step, step.group_number, step.level
            )?;
            writeln!(f, "│   present: {:?}", step.present)?;
            writeln!(f, "│   absent:  {:?}", step.absent)?;
        }
        writeln!(f, "│")?;
        writeln!(
            f,
            "└──────────────────────────────────────────────────────────────┘"
        )?;

        if !self.decisions.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "┌─ PLANNER DECISIONS ──────────────────────────────────────────┐"
            )?;
            for decision in &self.decisions {
                match decision {
                    PlanDecision::DefaultedRowsAxis { breakout_count } => {
                        writeln!(f, "│ • Defaulted Rows Axis")?;
                        writeln!(f, "│   Using all {breakout_count} breakouts in query order")?;
                    }
                    PlanDecision::CollapsedCombinations { candidates, unique } => {
                        writeln!(f, "│ • Collapsed Duplicate Combinations")?;
                        writeln!(f, "│   {candidates} candidates → {unique} queries")?;
                    }
                }
            }
            writeln!(
                f,
                "└──────────────────────────────────────────────────────────────┘"
            )?;
        }

        Ok(())
    }
}
