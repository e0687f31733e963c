//! Structured failures raised while planning a pivot run.
//!
//! Public functions return [`anyhow::Result`]; the errors in this module travel
//! inside it and can be recovered with `err.downcast_ref::<PivotError>()`.
//! Failures reported by the query engine are never wrapped here.

use crate::query::Query;
use std::fmt;

/// Which pivot axis an index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "pivot_rows"),
            Self::Columns => write!(f, "pivot_cols"),
        }
    }
}

/// The request itself is unusable; nothing has been built or executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    /// An axis names a breakout index the base query does not have.
    AxisOutOfRange {
        axis: Axis,
        index: usize,
        breakout_count: usize,
    },
    /// Group numbers would not fit in 64 bits.
    TooManyBreakouts { breakout_count: usize, max: usize },
    /// The raw request could not be read.
    Malformed { message: String },
}

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AxisOutOfRange {
                axis,
                index,
                breakout_count,
            } => write!(
                f,
                "{axis} index {index} is out of range for a query with {breakout_count} breakout(s)"
            ),
            Self::TooManyBreakouts {
                breakout_count,
                max,
            } => write!(
                f,
                "pivot queries support at most {max} breakouts, got {breakout_count}"
            ),
            Self::Malformed { message } => write!(f, "malformed pivot request: {message}"),
        }
    }
}

/// Error type for the pivot planner.
#[derive(Debug)]
pub enum PivotError {
    InvalidRequest(InvalidRequest),
    /// The base query could not be rewritten into derived queries.
    QueryGeneration {
        query: Box<Query>,
        source: anyhow::Error,
    },
}

impl PivotError {
    pub(crate) fn axis_out_of_range(axis: Axis, index: usize, breakout_count: usize) -> Self {
        Self::InvalidRequest(InvalidRequest::AxisOutOfRange {
            axis,
            index,
            breakout_count,
        })
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::InvalidRequest(InvalidRequest::Malformed {
            message: message.into(),
        })
    }

    pub(crate) fn query_generation(query: &Query, source: anyhow::Error) -> Self {
        Self::QueryGeneration {
            query: Box::new(query.clone()),
            source,
        }
    }

    /// The invalid-request detail, if this is one.
    #[must_use]
    pub fn as_invalid_request(&self) -> Option<&InvalidRequest> {
        match self {
            Self::InvalidRequest(inner) => Some(inner),
            Self::QueryGeneration { .. } => None,
        }
    }
}

impl fmt::Display for PivotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(inner) => write!(f, "invalid pivot request: {inner}"),
            Self::QueryGeneration { source, .. } => {
                write!(f, "failed to generate pivot queries: {source}")
            }
        }
    }
}

impl std::error::Error for PivotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::QueryGeneration { source, .. } => Some(&**source),
        }
    }
}

impl From<InvalidRequest> for PivotError {
    fn from(inner: InvalidRequest) -> Self {
        Self::InvalidRequest(inner)
    }
}
