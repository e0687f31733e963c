//! Testing utilities for pivot planning and merging.
//!
//! - **Mock engine**: [`MemoryEngine`] runs structured queries over in-memory
//!   JSON records, with hooks to inject failures and cancellation
//! - **Fixtures**: a small sales dataset and a three-breakout base query
//! - **Assertions**: schema-width and group-order checks for merged results
//!
//! # Quick Start
//!
//! ```
//! use ironpivot::*;
//! use ironpivot::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = fixtures::sales_engine();
//! let request = PivotRequest::new(fixtures::sales_query());
//!
//! let result = run_pivot_query(&engine, &request, None, None)?;
//! assert_rows_match_schema(&result);
//! assert_group_sequence(&result, "pivot-grouping", &[0, 4, 6, 7]);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_engine;

pub use assertions::*;
pub use mock_engine::{MemoryEngine, Record};
