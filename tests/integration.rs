//! End-to-end tests from raw JSON requests to merged results.

use anyhow::Result;
use ironpivot::query::FilterOp;
use ironpivot::testing::{MemoryEngine, assert_group_sequence, assert_rows_match_schema, fixtures};
use ironpivot::{
    Aggregation, Breakout, InvalidRequest, PivotError, PivotRequest, QueryBuilder, RequestInfo,
    RunStatus, run_pivot_json, run_pivot_query,
};
use serde_json::{Value, json};

fn raw_request(rows_key: &str, cols_key: &str) -> Value {
    json!({
        "query": {
            "database": 1,
            "kind": {
                "type": "structured",
                "source_table": fixtures::SALES_TABLE,
                "breakouts": [
                    {"type": "field", "name": "state"},
                    {"type": "field", "name": "category"}
                ],
                "aggregations": [
                    {"fn": "count"},
                    {"fn": "sum", "field": "amount", "name": "revenue"}
                ]
            }
        },
        rows_key: [0],
        cols_key: [1]
    })
}

#[test]
fn kebab_and_snake_requests_produce_the_same_result() -> Result<()> {
    let engine = fixtures::sales_engine();
    let kebab = run_pivot_json(&engine, raw_request("pivot-rows", "pivot-cols"), None, None)?;
    let snake = run_pivot_json(&engine, raw_request("pivot_rows", "pivot_cols"), None, None)?;

    assert_eq!(kebab, snake);
    // A single row breakout has no prefix subtotals: categories 2, states 3, total 1
    assert_eq!(kebab.row_count, 6);
    assert_group_sequence(&kebab, "pivot-grouping", &[1, 2, 3]);
    assert!(kebab.column_index("revenue").is_some());
    Ok(())
}

#[test]
fn malformed_json_is_an_invalid_request() {
    let engine = fixtures::sales_engine();
    let err = run_pivot_json(&engine, json!({"pivot_rows": [0]}), None, None).unwrap_err();

    let pivot = err.downcast_ref::<PivotError>().expect("pivot error");
    assert!(matches!(
        pivot.as_invalid_request(),
        Some(InvalidRequest::Malformed { .. })
    ));
    assert!(engine.executed_queries().is_empty());
}

#[test]
fn request_parses_from_text() -> Result<()> {
    let text = serde_json::to_string(&raw_request("pivot-rows", "pivot-cols"))?;
    let request = PivotRequest::from_json_str(&text)?;
    assert_eq!(request.rows(), Some(&[0][..]));
    assert_eq!(request.cols(), Some(&[1][..]));

    let err = PivotRequest::from_json_str("{not json").unwrap_err();
    assert!(err.downcast_ref::<PivotError>().is_some());
    Ok(())
}

#[test]
fn request_info_reaches_the_engine() -> Result<()> {
    let engine = fixtures::sales_engine();
    let info = RequestInfo {
        context: Some("dashboard".to_string()),
        dashboard_id: Some(7),
        executed_by: Some(3),
        ..RequestInfo::default()
    };
    let request = PivotRequest::new(fixtures::sales_query());
    run_pivot_query(&engine, &request, Some(info.clone()), None)?;

    let executed = engine.executed_queries();
    assert_eq!(executed.len(), 4);
    assert!(executed.iter().all(|q| q.info.as_ref() == Some(&info)));
    Ok(())
}

#[test]
fn filters_and_extra_aggregations_ride_along() -> Result<()> {
    let engine = fixtures::sales_engine();
    let base = QueryBuilder::new(1, fixtures::SALES_TABLE)
        .breakout(Breakout::field("state"))
        .breakout(Breakout::field("source"))
        .aggregate(Aggregation::avg("amount"))
        .aggregate(Aggregation::sum("amount").named("total"))
        .filter("category", FilterOp::Eq, json!("Widget"))
        .build();
    let result = run_pivot_query(&engine, &PivotRequest::new(base), None, None)?;

    assert_eq!(result.status, RunStatus::Completed);
    assert_rows_match_schema(&result);
    assert_group_sequence(&result, "pivot-grouping", &[0, 2, 3]);

    let total = result.column_index("total").unwrap();
    let grand = result.rows.last().unwrap();
    // Widget orders: 80 + 200 + 15 + 90 + 10 + 50
    assert_eq!(grand[total], json!(445));
    Ok(())
}

#[test]
fn empty_table_still_reports_a_grand_total_row() -> Result<()> {
    let engine = MemoryEngine::new().with_table(fixtures::SALES_TABLE, Vec::new());
    let result = run_pivot_query(&engine, &PivotRequest::new(fixtures::sales_query()), None, None)?;

    // Grouping only on the marker yields no group without input rows.
    assert!(result.rows.is_empty());
    assert_eq!(result.columns.len(), 6);
    assert_eq!(result.status, RunStatus::Completed);
    Ok(())
}

#[test]
fn duplicate_axis_indices_collapse() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query())
        .with_rows(vec![0, 0])
        .with_cols(vec![0]);
    let result = run_pivot_query(&engine, &request, None, None)?;

    assert_rows_match_schema(&result);
    // {state} = 6, {} = 7
    assert_group_sequence(&result, "pivot-grouping", &[6, 7]);
    Ok(())
}
