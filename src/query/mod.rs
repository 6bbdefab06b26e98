//! PromQL query builder
//!
//! Builds PromQL expressions from fluent calls:
//!
//! - **ops**: Operation ledger recorded by builder calls
//! - **assemble**: Turns the ledger into the final expression
//! - **builder**: Public fluent API with argument checks
//! - **error**: Error types
//!
//! # Ordering
//!
//! Aggregations and functions nest in call order (the first call is the
//! innermost). Offset, range window and trailing suffix are positioned by
//! kind, not by when they were called:
//!
//! ```text
//! <aggs/functions>( selector{labels}[range] offset <x> ) <suffix>
//! ```
//!
//! # Example
//!
//! ```rust
//! use promsql::query::QueryBuilder;
//!
//! let query = QueryBuilder::new()
//!     .metric(&["cpu_used"])?
//!     .eq("user", "001")?
//!     .func_range("avg_over_time", "300s")?
//!     .offset("5m")?
//!     .min(&["type"])
//!     .build();
//!
//! assert_eq!(query, r#"min by(type)(avg_over_time(cpu_used{user="001"}[300s] offset 5m))"#);
//! # Ok::<(), promsql::QueryError>(())
//! ```

mod assemble;
mod builder;
mod error;
mod ops;
mod validate;

pub use assemble::{assemble, METRIC_NAME_LABEL};
pub use builder::{builder, Aggregation, Grouping, QueryBuilder};
pub use error::{QueryError, QueryResult};
pub use ops::{LabelRef, Ledger, Matcher, Op, Template};
