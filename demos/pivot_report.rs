//! Pivot the sample sales data by (state, source) against category and print
//! the plan, the merged rows and the run metrics.
//!
//! Run with `RUST_LOG=ironpivot=debug` to see per-query events.

use anyhow::Result;
use ironpivot::metrics::MetricsCollector;
use ironpivot::testing::fixtures;
use ironpivot::{
    ExecutionContext, PivotConfig, PivotRequest, QueryResult, build_plan, run_pivot_query,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ironpivot=info")),
        )
        .init();

    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query())
        .with_rows(vec![0, 1])
        .with_cols(vec![2]);

    let plan = build_plan(&engine, &request, None, &PivotConfig::default())?;
    println!("{}", plan.explain());

    let metrics = MetricsCollector::new();
    let ctx = ExecutionContext::new().with_metrics(metrics.clone());
    let result = run_pivot_query(&engine, &request, None, Some(ctx))?;

    print_table(&result);
    metrics.print();
    Ok(())
}

fn print_table(result: &QueryResult) {
    let header: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| if v.is_null() { "-".to_string() } else { v.to_string() })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("({} rows, {:?})", result.row_count, result.status);
}
