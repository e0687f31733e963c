//! Tests for the sequential merger: ordering, alignment, cancellation and
//! error propagation.

use anyhow::{Result, bail};
use ironpivot::testing::{assert_group_sequence, assert_rows_match_schema, fixtures, group_numbers};
use ironpivot::{
    CancellationToken, ColumnMeta, CollectRows, CountRows, ExecutionContext, PivotConfig,
    PivotError, PivotRequest, QueryResult, Row, RowReducer, RowTransform, RunStatus, Runner,
    build_plan, run_pivot_query, run_pivot_query_with,
};
use serde_json::{Value, json};

const MARKER: &str = "pivot-grouping";

fn column(result: &QueryResult, name: &str) -> usize {
    result.column_index(name).expect("column present")
}

fn rows_in_group(result: &QueryResult, group: u64) -> Vec<&Row> {
    let idx = column(result, MARKER);
    result
        .rows
        .iter()
        .filter(|r| r[idx].as_u64() == Some(group))
        .collect()
}

#[test]
fn rows_only_run_merges_every_level() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query());
    let result = run_pivot_query(&engine, &request, None, None)?;

    assert_eq!(result.status, RunStatus::Completed);
    // 9 details + 6 (state, source) + 3 states + 1 grand total
    assert_eq!(result.row_count, 19);
    assert_eq!(result.rows.len(), 19);
    assert_rows_match_schema(&result);
    assert_group_sequence(&result, MARKER, &[0, 4, 6, 7]);
    assert_eq!(engine.executed_queries().len(), 4);
    Ok(())
}

#[test]
fn absent_breakouts_are_null_in_subtotal_rows() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query());
    let result = run_pivot_query(&engine, &request, None, None)?;

    let (state, source, category) = (
        column(&result, "state"),
        column(&result, "source"),
        column(&result, "category"),
    );
    for row in rows_in_group(&result, 6) {
        assert!(row[state].is_string());
        assert!(row[source].is_null());
        assert!(row[category].is_null());
    }

    let totals = rows_in_group(&result, 7);
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0][column(&result, "count")], json!(12));
    assert_eq!(totals[0][column(&result, "sum")], json!(800));
    Ok(())
}

#[test]
fn reordered_breakouts_are_realigned_by_name() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query())
        .with_rows(vec![1, 0])
        .with_cols(vec![2]);
    let result = run_pivot_query(&engine, &request, None, None)?;

    assert_rows_match_schema(&result);
    assert_group_sequence(&result, MARKER, &[1, 3, 4, 5, 7]);
    // 4 (source, category) + 2 categories + 6 (source, state) + 2 sources + 1
    assert_eq!(result.row_count, 15);

    let (state, source, category) = (
        column(&result, "state"),
        column(&result, "source"),
        column(&result, "category"),
    );

    // The first query lacks `state`, so even it is reshaped.
    for row in rows_in_group(&result, 1) {
        assert!(row[state].is_null());
        assert!(row[source].is_string());
        assert!(row[category].is_string());
    }

    // (source, state) rows land in the schema's (state, source) positions.
    let by_state: Vec<(&Value, &Value)> = rows_in_group(&result, 4)
        .into_iter()
        .map(|r| (&r[state], &r[source]))
        .collect();
    assert!(by_state.contains(&(&json!("CA"), &json!("Store"))));
    assert!(by_state.contains(&(&json!("TX"), &json!("Web"))));
    assert!(
        rows_in_group(&result, 4)
            .iter()
            .all(|r| r[category].is_null())
    );
    Ok(())
}

#[test]
fn sums_agree_across_levels() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query())
        .with_rows(vec![0])
        .with_cols(vec![2]);
    let result = run_pivot_query(&engine, &request, None, None)?;
    let sum = column(&result, "sum");

    let groups = group_numbers(&result, MARKER);
    let mut distinct = groups.clone();
    distinct.dedup();
    for group in distinct {
        let total: i64 = rows_in_group(&result, group)
            .iter()
            .map(|r| r[sum].as_i64().unwrap())
            .sum();
        assert_eq!(total, 800, "group {group} does not add up");
    }
    Ok(())
}

#[test]
fn cancellation_between_queries_keeps_finished_rows() -> Result<()> {
    let engine = fixtures::sales_engine().cancel_after_executions(1);
    let cancel = CancellationToken::new();
    let ctx = ExecutionContext::new().with_cancel(cancel.clone());
    let request = PivotRequest::new(fixtures::sales_query());

    let result = run_pivot_query(&engine, &request, None, Some(ctx))?;

    assert!(cancel.is_cancelled());
    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.row_count, 9);
    assert_group_sequence(&result, MARKER, &[0]);
    assert_eq!(engine.executed_queries().len(), 1);
    Ok(())
}

#[test]
fn cancelled_before_start_runs_nothing() -> Result<()> {
    let engine = fixtures::sales_engine();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = ExecutionContext::new().with_cancel(cancel);
    let request = PivotRequest::new(fixtures::sales_query());

    let result = run_pivot_query(&engine, &request, None, Some(ctx))?;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.rows.is_empty());
    assert_eq!(result.columns.len(), 6);
    assert!(engine.executed_queries().is_empty());
    Ok(())
}

#[test]
fn engine_failure_stops_the_run() {
    let engine = fixtures::sales_engine().fail_on_execution(1);
    let request = PivotRequest::new(fixtures::sales_query());

    let err = run_pivot_query(&engine, &request, None, None).unwrap_err();

    assert!(err.downcast_ref::<PivotError>().is_none());
    assert!(err.to_string().contains("simulated engine failure"));
    assert_eq!(engine.executed_queries().len(), 2);
}

#[test]
fn invalid_axes_fail_before_anything_executes() {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query()).with_rows(vec![7]);

    let err = run_pivot_query(&engine, &request, None, None).unwrap_err();

    let pivot = err.downcast_ref::<PivotError>().expect("pivot error");
    assert!(pivot.as_invalid_request().is_some());
    assert!(engine.executed_queries().is_empty());
}

#[test]
fn count_rows_reducer_sees_the_same_stream() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query());
    let (count, status) = run_pivot_query_with(&engine, &request, None, None, &CountRows)?;

    assert_eq!(count, 19);
    assert_eq!(status, RunStatus::Completed);
    Ok(())
}

struct FailAfter(u64);

impl RowReducer<u64, u64> for FailAfter {
    fn init(&self, _columns: &[ColumnMeta]) -> u64 {
        0
    }

    fn step(&self, acc: &mut u64, _row: Row) -> Result<()> {
        *acc += 1;
        if *acc > self.0 {
            bail!("reducer full after {} rows", self.0);
        }
        Ok(())
    }

    fn complete(&self, acc: u64, _status: RunStatus) -> u64 {
        acc
    }
}

#[test]
fn reducer_errors_abort_the_run() {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query());

    let err = run_pivot_query_with(&engine, &request, None, None, &FailAfter(10)).unwrap_err();

    assert!(err.to_string().contains("reducer full"));
    // The failure happens inside the second query.
    assert_eq!(engine.executed_queries().len(), 2);
}

#[test]
fn runner_drives_a_prebuilt_plan() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query()).with_cols(vec![1]);
    let plan = build_plan(&engine, &request, None, &PivotConfig::default())?;

    let result = Runner::new(&engine).run(&plan, &CollectRows)?;
    assert_eq!(result.columns, plan.expected_schema);
    assert_rows_match_schema(&result);
    Ok(())
}

#[test]
fn only_an_aligned_first_query_passes_through() {
    let meta = |name: &str| ColumnMeta::new(name, ironpivot::ColumnSource::Breakout);
    let expected = vec![meta("a"), meta("b")];

    assert_eq!(
        RowTransform::for_query(0, &expected, &expected),
        RowTransform::PassThrough
    );
    assert!(matches!(
        RowTransform::for_query(1, &expected, &expected),
        RowTransform::Remap(_)
    ));

    let swapped = vec![meta("b"), meta("a")];
    let transform = RowTransform::for_query(0, &expected, &swapped);
    assert_eq!(transform.apply(vec![json!(2), json!(1)]), vec![json!(1), json!(2)]);
}

#[test]
fn progress_logging_does_not_change_output() -> Result<()> {
    let engine = fixtures::sales_engine();
    let config = PivotConfig {
        progress_log_interval: Some(2),
        ..PivotConfig::default()
    };
    let request = PivotRequest::new(fixtures::sales_query());
    let result = run_pivot_query(
        &engine,
        &request,
        None,
        Some(ExecutionContext::new().with_config(config)),
    )?;
    assert_eq!(result.row_count, 19);
    Ok(())
}
