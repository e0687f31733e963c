//! The seam to the external query execution engine.
//!
//! The planner never decides how a query runs. It only needs two capabilities:
//! a dry description of the columns a query would produce, and an execution
//! call that pushes rows to a callback in the engine's native order.

use crate::cancel::CancellationToken;
use crate::query::Query;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row; absent cells are [`Value::Null`].
pub type Row = Vec<Value>;

/// What produced an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Breakout,
    Aggregation,
    Expression,
}

/// Column metadata as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub source: ColumnSource,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, source: ColumnSource) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            base_type: None,
            source,
        }
    }

    #[must_use]
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }
}

/// An engine capable of describing and executing [`Query`] values.
pub trait QueryEngine: Send + Sync {
    /// Output columns `query` would produce, without running it.
    ///
    /// # Errors
    ///
    /// Engine-specific; the planner propagates these unchanged.
    fn describe_columns(&self, query: &Query) -> Result<Vec<ColumnMeta>>;

    /// Run `query`, calling `on_row` once per row in emission order.
    ///
    /// Implementations should check `cancel` at least once per row and return
    /// `Ok(())` early when it is set. An error from `on_row` must abort the
    /// execution and be returned as is.
    ///
    /// # Errors
    ///
    /// Engine-specific execution failures, or the first error from `on_row`.
    fn execute(
        &self,
        query: &Query,
        on_row: &mut dyn FnMut(Row) -> Result<()>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}
