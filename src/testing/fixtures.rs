//! Pre-built datasets and queries for pivot tests.

use crate::query::{Aggregation, Breakout, Query, QueryBuilder};
use crate::testing::mock_engine::{MemoryEngine, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Table name the sales fixtures live under.
pub const SALES_TABLE: &str = "orders";

/// One order line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleOrder {
    pub state: String,
    pub source: String,
    pub category: String,
    pub amount: i64,
}

impl SampleOrder {
    fn new(state: &str, source: &str, category: &str, amount: i64) -> Self {
        Self {
            state: state.to_string(),
            source: source.to_string(),
            category: category.to_string(),
            amount,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        let mut record = Map::new();
        record.insert("state".into(), Value::from(self.state.clone()));
        record.insert("source".into(), Value::from(self.source.clone()));
        record.insert("category".into(), Value::from(self.category.clone()));
        record.insert("amount".into(), Value::from(self.amount));
        record
    }
}

/// Twelve orders over three states, two sources and two categories.
///
/// Not every (state, source, category) combination occurs, so detail-level
/// queries return fewer rows than the full cross product.
#[must_use]
pub fn sample_orders() -> Vec<SampleOrder> {
    vec![
        SampleOrder::new("CA", "Web", "Gizmo", 120),
        SampleOrder::new("CA", "Web", "Widget", 80),
        SampleOrder::new("CA", "Store", "Gizmo", 45),
        SampleOrder::new("CA", "Web", "Gizmo", 30),
        SampleOrder::new("NY", "Web", "Widget", 200),
        SampleOrder::new("NY", "Store", "Widget", 15),
        SampleOrder::new("NY", "Store", "Gizmo", 60),
        SampleOrder::new("TX", "Store", "Gizmo", 75),
        SampleOrder::new("TX", "Store", "Gizmo", 25),
        SampleOrder::new("TX", "Web", "Widget", 90),
        SampleOrder::new("TX", "Store", "Widget", 10),
        SampleOrder::new("NY", "Web", "Widget", 50),
    ]
}

#[must_use]
pub fn sales_rows() -> Vec<Record> {
    sample_orders().iter().map(SampleOrder::to_record).collect()
}

/// `count` and `sum(amount)` broken out by state, source and category.
#[must_use]
pub fn sales_query() -> Query {
    QueryBuilder::new(1, SALES_TABLE)
        .breakout(Breakout::field("state"))
        .breakout(Breakout::field("source"))
        .breakout(Breakout::field("category"))
        .aggregate(Aggregation::count())
        .aggregate(Aggregation::sum("amount"))
        .build()
}

/// A [`MemoryEngine`] loaded with [`sales_rows`].
#[must_use]
pub fn sales_engine() -> MemoryEngine {
    MemoryEngine::new().with_table(SALES_TABLE, sales_rows())
}
