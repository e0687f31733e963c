//! Rewrite the base query into a derived query for one breakout subset.

use crate::grouping::GroupNumber;
use crate::query::{Breakout, Expression, Query};
use anyhow::{Context, Result, bail};

/// Default name of the synthetic grouping column.
pub const DEFAULT_GROUPING_COLUMN: &str = "pivot-grouping";

/// Build the derived query for `breakouts` tagged with `group_number`.
///
/// The result keeps everything from `base` except the breakout list, which
/// becomes `breakouts` followed by a reference to a new `grouping_column`
/// expression evaluating to `abs(group_number)`. The marker is grouped on
/// because engines reject projected values that are neither aggregated nor
/// grouped. `base` is left untouched.
///
/// # Errors
///
/// Fails if `base` is not a structured query, already defines an expression
/// called `grouping_column`, or `group_number` does not fit the marker literal.
pub fn rewrite(
    base: &Query,
    breakouts: Vec<Breakout>,
    group_number: GroupNumber,
    grouping_column: &str,
) -> Result<Query> {
    let marker = i64::try_from(group_number)
        .with_context(|| format!("group number {group_number} does not fit the grouping marker"))?;

    let mut derived = base.clone();
    let inner = derived.inner_mut()?;
    if inner.expressions.contains_key(grouping_column) {
        bail!("query already defines an expression named `{grouping_column}`");
    }
    inner
        .expressions
        .insert(grouping_column.to_string(), Expression::grouping_marker(marker));
    inner.breakouts = breakouts;
    inner.breakouts.push(Breakout::expression(grouping_column));
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Aggregation, QueryBuilder};

    fn base() -> Query {
        QueryBuilder::new(1, "orders")
            .breakout(Breakout::field("state"))
            .breakout(Breakout::field("source"))
            .aggregate(Aggregation::count())
            .build()
    }

    #[test]
    fn appends_marker_after_subset() {
        let q = base();
        let derived = rewrite(&q, vec![Breakout::field("source")], 1, DEFAULT_GROUPING_COLUMN).unwrap();
        let inner = derived.inner().unwrap();
        assert_eq!(
            inner.breakouts,
            vec![Breakout::field("source"), Breakout::expression("pivot-grouping")]
        );
        assert_eq!(
            inner.expressions.get("pivot-grouping"),
            Some(&Expression::grouping_marker(1))
        );
        assert_eq!(inner.aggregations, q.inner().unwrap().aggregations);
    }

    #[test]
    fn base_is_not_mutated() {
        let q = base();
        let before = q.clone();
        let _ = rewrite(&q, vec![], 3, DEFAULT_GROUPING_COLUMN).unwrap();
        assert_eq!(q, before);
    }

    #[test]
    fn native_query_cannot_be_rewritten() {
        let q = Query::native(1, "select 1");
        assert!(rewrite(&q, vec![], 0, DEFAULT_GROUPING_COLUMN).is_err());
    }

    #[test]
    fn marker_name_collision_is_rejected() {
        let q = QueryBuilder::new(1, "orders")
            .expression("pivot-grouping", Expression::Literal { value: 9 })
            .build();
        assert!(rewrite(&q, vec![], 0, DEFAULT_GROUPING_COLUMN).is_err());
    }
}
