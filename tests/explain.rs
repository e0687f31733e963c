//! Tests for plan explanation output.

use anyhow::Result;
use ironpivot::testing::fixtures;
use ironpivot::{PivotConfig, PivotRequest, PlanDecision, build_plan};

#[test]
fn explain_lists_steps_in_run_order() -> Result<()> {
    let engine = fixtures::sales_engine();
    let request = PivotRequest::new(fixtures::sales_query())
        .with_rows(vec![1, 0])
        .with_cols(vec![2]);
    let plan = build_plan(&engine, &request, None, &PivotConfig::default())?;
    let explanation = plan.explain();

    assert_eq!(explanation.breakout_count, 3);
    assert_eq!(explanation.steps.len(), 5);

    let first = &explanation.steps[0];
    assert_eq!(first.step, 1);
    assert_eq!(first.group_number, 1);
    assert_eq!(first.present, vec![1, 2]);
    assert_eq!(first.absent, vec![0]);
    assert_eq!(first.level, "subtotal");

    let last = explanation.steps.last().unwrap();
    assert_eq!(last.group_number, 7);
    assert!(last.present.is_empty());
    assert_eq!(last.level, "grand total");
    Ok(())
}

#[test]
fn explain_labels_the_detail_level() -> Result<()> {
    let engine = fixtures::sales_engine();
    let plan = build_plan(
        &engine,
        &PivotRequest::new(fixtures::sales_query()),
        None,
        &PivotConfig::default(),
    )?;
    let explanation = plan.explain();

    assert_eq!(explanation.steps[0].level, "detail");
    assert!(explanation.steps[0].absent.is_empty());
    assert_eq!(
        explanation.schema_columns,
        vec!["state", "source", "category", "pivot-grouping", "count", "sum"]
    );
    assert!(
        explanation
            .decisions
            .contains(&PlanDecision::DefaultedRowsAxis { breakout_count: 3 })
    );
    Ok(())
}

#[test]
fn explain_display_renders_every_section() -> Result<()> {
    let engine = fixtures::sales_engine();
    let plan = build_plan(
        &engine,
        &PivotRequest::new(fixtures::sales_query()),
        None,
        &PivotConfig::default(),
    )?;
    let rendered = plan.explain().to_string();

    assert!(rendered.contains("PIVOT PLAN EXPLANATION"));
    assert!(rendered.contains("EXPECTED SCHEMA"));
    assert!(rendered.contains("Step 1: group 0 [detail]"));
    assert!(rendered.contains("Step 4: group 7 [grand total]"));
    assert!(rendered.contains("Defaulted Rows Axis"));
    assert!(rendered.contains("7 candidates → 4 queries"));
    Ok(())
}
