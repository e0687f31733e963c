//! Incoming pivot requests and their normalization.
//!
//! Clients send the axis lists under either `pivot_rows`/`pivot_cols` or
//! `pivot-rows`/`pivot-cols`; both spellings deserialize to the same
//! [`PivotRequest`].

use crate::error::PivotError;
use crate::query::Query;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A base query plus the client's rows/columns split of its breakouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRequest {
    pub query: Query,
    #[serde(default, alias = "pivot-rows", skip_serializing_if = "Option::is_none")]
    pub pivot_rows: Option<Vec<usize>>,
    #[serde(default, alias = "pivot-cols", skip_serializing_if = "Option::is_none")]
    pub pivot_cols: Option<Vec<usize>>,
}

/// Opaque execution context the caller wants forwarded to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<u64>,
}

impl PivotRequest {
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            pivot_rows: None,
            pivot_cols: None,
        }
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Vec<usize>) -> Self {
        self.pivot_rows = Some(rows);
        self
    }

    #[must_use]
    pub fn with_cols(mut self, cols: Vec<usize>) -> Self {
        self.pivot_cols = Some(cols);
        self
    }

    /// Parse and normalize a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request [`PivotError`] if the text is not a request.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| PivotError::malformed(format!("not valid JSON: {e}")))?;
        normalize(raw)
    }

    #[must_use]
    pub fn rows(&self) -> Option<&[usize]> {
        self.pivot_rows.as_deref()
    }

    #[must_use]
    pub fn cols(&self) -> Option<&[usize]> {
        self.pivot_cols.as_deref()
    }
}

/// Canonicalize a raw request.
///
/// # Errors
///
/// Returns an invalid-request [`PivotError`] when the body does not describe a
/// pivot request.
pub fn normalize(raw: Value) -> Result<PivotRequest> {
    serde_json::from_value(raw)
        .map_err(|e| PivotError::malformed(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(rows_key: &str, cols_key: &str) -> Value {
        json!({
            "query": {
                "database": 1,
                "kind": {
                    "type": "structured",
                    "source_table": "orders",
                    "breakouts": [
                        {"type": "field", "name": "state"},
                        {"type": "field", "name": "source"}
                    ],
                    "aggregations": [{"fn": "count"}]
                }
            },
            rows_key: [1],
            cols_key: [0]
        })
    }

    #[test]
    fn both_key_spellings_normalize_alike() {
        let snake = normalize(body("pivot_rows", "pivot_cols")).unwrap();
        let kebab = normalize(body("pivot-rows", "pivot-cols")).unwrap();
        assert_eq!(snake, kebab);
        assert_eq!(snake.rows(), Some(&[1][..]));
        assert_eq!(snake.cols(), Some(&[0][..]));
    }

    #[test]
    fn axes_are_optional() {
        let req = normalize(json!({"query": {"database": 1, "kind": {"type": "native", "sql": "select 1"}}}))
            .unwrap();
        assert!(req.rows().is_none());
        assert!(req.cols().is_none());
    }

    #[test]
    fn garbage_is_an_invalid_request() {
        let err = PivotRequest::from_json_str("{\"pivot_rows\": [0]}").unwrap_err();
        let pivot = err.downcast_ref::<PivotError>().unwrap();
        assert!(pivot.as_invalid_request().is_some());
    }
}
