//! The analytical query shape the planner rewrites.
//!
//! Only the parts the planner touches are modelled structurally: the breakout
//! list, the named expressions, and the aggregations (which decide the output
//! columns). Filters and ordering ride along untouched.

use crate::request::RequestInfo;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A query as submitted to the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub database: u64,
    pub kind: QueryKind,
    /// Caller-supplied context forwarded to the engine with every derived query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<RequestInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryKind {
    Structured(StructuredQuery),
    /// Raw engine text; it has no breakout or expression containers to rewrite.
    Native { sql: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub source_table: String,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub breakouts: Vec<Breakout>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub expressions: BTreeMap<String, Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// A grouping column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Breakout {
    Field { name: String },
    Expression { name: String },
}

impl Breakout {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }

    pub fn expression(name: impl Into<String>) -> Self {
        Self::Expression { name: name.into() }
    }

    /// Name of the output column this breakout produces.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field { name } | Self::Expression { name } => name,
        }
    }
}

/// Computed column definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expression {
    Literal { value: i64 },
    Abs { arg: Box<Expression> },
    Field { name: String },
}

impl Expression {
    /// `abs(group_number)`: constant for every row of the derived query.
    #[must_use]
    pub fn grouping_marker(group_number: i64) -> Self {
        Self::Abs {
            arg: Box::new(Self::Literal {
                value: group_number,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(flatten)]
    pub kind: AggregationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum AggregationKind {
    Count,
    Sum { field: String },
    Min { field: String },
    Max { field: String },
    Avg { field: String },
}

impl Aggregation {
    #[must_use]
    pub fn count() -> Self {
        Self {
            kind: AggregationKind::Count,
            name: None,
        }
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            kind: AggregationKind::Sum {
                field: field.into(),
            },
            name: None,
        }
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self {
            kind: AggregationKind::Avg {
                field: field.into(),
            },
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Output column name; defaults to the function name.
    #[must_use]
    pub fn output_name(&self) -> &str {
        if let Some(name) = &self.name {
            return name;
        }
        match self.kind {
            AggregationKind::Count => "count",
            AggregationKind::Sum { .. } => "sum",
            AggregationKind::Min { .. } => "min",
            AggregationKind::Max { .. } => "max",
            AggregationKind::Avg { .. } => "avg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
}

impl Query {
    pub fn structured(database: u64, inner: StructuredQuery) -> Self {
        Self {
            database,
            kind: QueryKind::Structured(inner),
            info: None,
        }
    }

    pub fn native(database: u64, sql: impl Into<String>) -> Self {
        Self {
            database,
            kind: QueryKind::Native { sql: sql.into() },
            info: None,
        }
    }

    /// The structured body.
    ///
    /// # Errors
    ///
    /// Native queries have no structured body.
    pub fn inner(&self) -> Result<&StructuredQuery> {
        match &self.kind {
            QueryKind::Structured(inner) => Ok(inner),
            QueryKind::Native { .. } => bail!("native queries have no breakouts or expressions"),
        }
    }

    /// Mutable structured body.
    ///
    /// # Errors
    ///
    /// Native queries have no structured body.
    pub fn inner_mut(&mut self) -> Result<&mut StructuredQuery> {
        match &mut self.kind {
            QueryKind::Structured(inner) => Ok(inner),
            QueryKind::Native { .. } => bail!("native queries have no breakouts or expressions"),
        }
    }

    /// # Errors
    ///
    /// Native queries have no breakouts.
    pub fn breakouts(&self) -> Result<&[Breakout]> {
        Ok(&self.inner()?.breakouts)
    }
}

/// Builder used by fixtures, demos and tests.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    database: u64,
    inner: StructuredQuery,
}

impl QueryBuilder {
    pub fn new(database: u64, source_table: impl Into<String>) -> Self {
        Self {
            database,
            inner: StructuredQuery {
                source_table: source_table.into(),
                ..StructuredQuery::default()
            },
        }
    }

    #[must_use]
    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.inner.aggregations.push(aggregation);
        self
    }

    #[must_use]
    pub fn breakout(mut self, breakout: Breakout) -> Self {
        self.inner.breakouts.push(breakout);
        self
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.inner.filters.push(Filter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    #[must_use]
    pub fn expression(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.inner.expressions.insert(name.into(), expression);
        self
    }

    #[must_use]
    pub fn build(self) -> Query {
        Query::structured(self.database, self.inner)
    }
}
