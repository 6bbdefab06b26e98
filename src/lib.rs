//! # promsql
//!
//! A fluent builder for PromQL query expressions.
//!
//! ## Features
//!
//! - **Label filters**: `=`, `!=`, `=~`, `!~`, with conditional variants
//! - **Multi-metric selection**: several names collapse into a `__name__` regex
//! - **Nesting in call order**: aggregations and functions wrap what came before
//! - **Recipes**: builder steps stored as TOML or JSON and replayed later
//!
//! ## Modules
//!
//! - [`query`]: Operation ledger, assembly engine and builder
//! - [`recipe`]: Serializable step lists
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use promsql::QueryBuilder;
//!
//! fn main() -> Result<(), promsql::QueryError> {
//!     let query = QueryBuilder::new()
//!         .metric(&["instance_memory_usage_bytes"])?
//!         .sum(&["app", "proc"])
//!         .last(" / 1024 / 1024")
//!         .build();
//!
//!     assert_eq!(query, "sum by(app, proc)(instance_memory_usage_bytes) / 1024 / 1024");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod query;
pub mod recipe;

pub use query::{
    builder, Aggregation, Grouping, Ledger, Matcher, Op, QueryBuilder, QueryError, QueryResult,
    Template,
};

pub use recipe::{Recipe, RecipeError, RecipeFormat, Step};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig, RecipesConfig};
