//! In-memory [`QueryEngine`] for tests and demos.
//!
//! `MemoryEngine` evaluates structured queries over JSON records: it applies
//! filters, groups by every breakout (evaluating expression breakouts such as
//! the grouping marker), computes aggregations, and emits one row per group
//! ordered by the breakout values. Column order is breakouts first, then
//! aggregations.
//!
//! Failure and cancellation hooks let tests exercise the merger's error and
//! cancellation paths.

use crate::cancel::CancellationToken;
use crate::engine::{ColumnMeta, ColumnSource, QueryEngine, Row};
use crate::query::{
    Aggregation, AggregationKind, Breakout, Expression, Filter, FilterOp, Query, StructuredQuery,
};
use anyhow::{Result, anyhow, bail};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// One source record: column name to value.
pub type Record = Map<String, Value>;

#[derive(Default)]
pub struct MemoryEngine {
    tables: HashMap<String, Vec<Record>>,
    fail_on_execution: Option<usize>,
    cancel_after_executions: Option<usize>,
    executed: Mutex<Vec<Query>>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.tables.insert(name.into(), records);
        self
    }

    /// Make the `n`th call to `execute` (0-based) fail before emitting rows.
    #[must_use]
    pub fn fail_on_execution(mut self, n: usize) -> Self {
        self.fail_on_execution = Some(n);
        self
    }

    /// Signal the run's cancellation token once `n` executions have finished.
    #[must_use]
    pub fn cancel_after_executions(mut self, n: usize) -> Self {
        self.cancel_after_executions = Some(n);
        self
    }

    /// Queries passed to `execute`, in call order.
    pub fn executed_queries(&self) -> Vec<Query> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `query` to completion and return its rows.
    ///
    /// # Errors
    ///
    /// Same as [`QueryEngine::execute`].
    pub fn rows(&self, query: &Query) -> Result<Vec<Row>> {
        let inner = query.inner()?;
        let table = self.table(inner)?;
        evaluate(inner, table, &CancellationToken::new())
    }

    fn table(&self, inner: &StructuredQuery) -> Result<&[Record]> {
        self.tables
            .get(&inner.source_table)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("unknown table `{}`", inner.source_table))
    }

    fn base_type_of(table: &[Record], field: &str) -> &'static str {
        table
            .iter()
            .filter_map(|r| r.get(field))
            .find(|v| !v.is_null())
            .map_or("type/*", |v| match v {
                Value::String(_) => "type/Text",
                Value::Bool(_) => "type/Boolean",
                Value::Number(n) if n.is_f64() => "type/Float",
                Value::Number(_) => "type/Integer",
                _ => "type/*",
            })
    }
}

impl QueryEngine for MemoryEngine {
    fn describe_columns(&self, query: &Query) -> Result<Vec<ColumnMeta>> {
        let inner = query.inner()?;
        let table = self.table(inner)?;

        let mut columns = Vec::with_capacity(inner.breakouts.len() + inner.aggregations.len());
        for breakout in &inner.breakouts {
            let column = match breakout {
                Breakout::Field { name } => ColumnMeta::new(name, ColumnSource::Breakout)
                    .with_base_type(Self::base_type_of(table, name)),
                Breakout::Expression { name } => {
                    if !inner.expressions.contains_key(name) {
                        bail!("breakout references undefined expression `{name}`");
                    }
                    ColumnMeta::new(name, ColumnSource::Expression).with_base_type("type/Integer")
                }
            };
            columns.push(column);
        }
        for aggregation in &inner.aggregations {
            let base_type = match &aggregation.kind {
                AggregationKind::Count => "type/BigInteger",
                AggregationKind::Avg { .. } => "type/Float",
                AggregationKind::Sum { field }
                | AggregationKind::Min { field }
                | AggregationKind::Max { field } => Self::base_type_of(table, field),
            };
            columns.push(
                ColumnMeta::new(aggregation.output_name(), ColumnSource::Aggregation)
                    .with_base_type(base_type),
            );
        }
        Ok(columns)
    }

    fn execute(
        &self,
        query: &Query,
        on_row: &mut dyn FnMut(Row) -> Result<()>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let call = {
            let mut executed = self.executed.lock().unwrap_or_else(PoisonError::into_inner);
            executed.push(query.clone());
            executed.len() - 1
        };
        if self.fail_on_execution == Some(call) {
            bail!("simulated engine failure on execution {call}");
        }

        let inner = query.inner()?;
        let table = self.table(inner)?;
        for row in evaluate(inner, table, cancel)? {
            if cancel.is_cancelled() {
                return Ok(());
            }
            on_row(row)?;
        }

        if self.cancel_after_executions == Some(call + 1) {
            cancel.cancel();
        }
        Ok(())
    }
}

fn evaluate(inner: &StructuredQuery, table: &[Record], cancel: &CancellationToken) -> Result<Vec<Row>> {
    let mut order: Vec<Row> = Vec::new();
    let mut groups: HashMap<String, (usize, Vec<Accumulator>)> = HashMap::new();

    for record in table {
        if cancel.is_cancelled() {
            break;
        }
        if !inner.filters.iter().all(|f| matches_filter(f, record)) {
            continue;
        }
        let key = inner
            .breakouts
            .iter()
            .map(|b| breakout_value(b, inner, record))
            .collect::<Result<Row>>()?;
        let slot = serde_json::to_string(&key)?;
        let entry = groups.entry(slot).or_insert_with(|| {
            order.push(key);
            (
                order.len() - 1,
                inner.aggregations.iter().map(Accumulator::new).collect(),
            )
        });
        for acc in &mut entry.1 {
            acc.add(record);
        }
    }

    let mut rows: Vec<(Row, Vec<Accumulator>)> = groups
        .into_values()
        .map(|(idx, accs)| (std::mem::take(&mut order[idx]), accs))
        .collect();
    rows.sort_by(|(a, _), (b, _)| compare_rows(a, b));

    let limit = inner.limit.unwrap_or(usize::MAX);
    Ok(rows
        .into_iter()
        .take(limit)
        .map(|(mut key, accs)| {
            key.extend(accs.into_iter().map(Accumulator::finish));
            key
        })
        .collect())
}

fn breakout_value(breakout: &Breakout, inner: &StructuredQuery, record: &Record) -> Result<Value> {
    match breakout {
        Breakout::Field { name } => Ok(record.get(name).cloned().unwrap_or(Value::Null)),
        Breakout::Expression { name } => {
            let expr = inner
                .expressions
                .get(name)
                .ok_or_else(|| anyhow!("breakout references undefined expression `{name}`"))?;
            eval_expression(expr, record)
        }
    }
}

fn eval_expression(expr: &Expression, record: &Record) -> Result<Value> {
    Ok(match expr {
        Expression::Literal { value } => json!(value),
        Expression::Field { name } => record.get(name).cloned().unwrap_or(Value::Null),
        Expression::Abs { arg } => match eval_expression(arg, record)? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    json!(i.unsigned_abs())
                } else if let Some(u) = n.as_u64() {
                    json!(u)
                } else {
                    json!(n.as_f64().map(f64::abs))
                }
            }
            Value::Null => Value::Null,
            other => bail!("abs() expects a number, got {other}"),
        },
    })
}

fn matches_filter(filter: &Filter, record: &Record) -> bool {
    let value = record.get(&filter.field).unwrap_or(&Value::Null);
    let ord = compare_values(value, &filter.value);
    match filter.op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Ne => ord != Ordering::Equal,
        FilterOp::Gt => ord == Ordering::Greater,
        FilterOp::Lt => ord == Ordering::Less,
    }
}

/// Nulls first, then booleans, numbers, strings; anything else compares by
/// its JSON text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or(f64::NAN)
                .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) == rank(b) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_rows(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

enum Accumulator {
    Count(u64),
    Sum { field: String, int: i64, float: f64, is_float: bool },
    Extreme { field: String, max: bool, best: Option<Value> },
    Avg { field: String, total: f64, n: u64 },
}

impl Accumulator {
    fn new(aggregation: &Aggregation) -> Self {
        match &aggregation.kind {
            AggregationKind::Count => Self::Count(0),
            AggregationKind::Sum { field } => Self::Sum {
                field: field.clone(),
                int: 0,
                float: 0.0,
                is_float: false,
            },
            AggregationKind::Min { field } => Self::Extreme {
                field: field.clone(),
                max: false,
                best: None,
            },
            AggregationKind::Max { field } => Self::Extreme {
                field: field.clone(),
                max: true,
                best: None,
            },
            AggregationKind::Avg { field } => Self::Avg {
                field: field.clone(),
                total: 0.0,
                n: 0,
            },
        }
    }

    fn add(&mut self, record: &Record) {
        match self {
            Self::Count(n) => *n += 1,
            Self::Sum {
                field,
                int,
                float,
                is_float,
            } => match record.get(field.as_str()) {
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(i) if !*is_float => *int += i,
                    _ => {
                        if !*is_float {
                            *is_float = true;
                            *float = *int as f64;
                        }
                        *float += n.as_f64().unwrap_or(0.0);
                    }
                },
                _ => {}
            },
            Self::Extreme { field, max, best } => {
                let Some(v) = record.get(field.as_str()).filter(|v| !v.is_null()) else {
                    return;
                };
                let replace = best.as_ref().is_none_or(|b| {
                    let ord = compare_values(v, b);
                    if *max { ord.is_gt() } else { ord.is_lt() }
                });
                if replace {
                    *best = Some(v.clone());
                }
            }
            Self::Avg { field, total, n } => {
                if let Some(x) = record.get(field.as_str()).and_then(Value::as_f64) {
                    *total += x;
                    *n += 1;
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Count(n) => json!(n),
            Self::Sum {
                int,
                float,
                is_float,
                ..
            } => {
                if is_float {
                    json!(float)
                } else {
                    json!(int)
                }
            }
            Self::Extreme { best, .. } => best.unwrap_or(Value::Null),
            Self::Avg { total, n, .. } => {
                if n == 0 {
                    Value::Null
                } else {
                    json!(total / n as f64)
                }
            }
        }
    }
}
