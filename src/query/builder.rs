//! Fluent query builder
//!
//! [`QueryBuilder`] validates each call's arguments and records the call in
//! its ledger. [`QueryBuilder::build`] hands the ledger to the assembly
//! engine.

use super::assemble::assemble;
use super::error::QueryResult;
use super::ops::{Ledger, Matcher, Op, Template};
use super::validate::{ensure_not_blank, ensure_not_empty};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation operators that accept a `by`/`without` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Min,
    Max,
    Avg,
    Count,
    /// All values in the resulting vector are 1
    Group,
    /// Population standard deviation
    Stddev,
    /// Population standard variance
    Stdvar,
}

impl Aggregation {
    /// Operator name as written in a query
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Count => "count",
            Self::Group => "group",
            Self::Stddev => "stddev",
            Self::Stdvar => "stdvar",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether aggregation labels are kept (`by`) or dropped (`without`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    #[default]
    By,
    Without,
}

impl Grouping {
    /// Clause keyword as written in a query
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::By => "by",
            Self::Without => "without",
        }
    }
}

/// Builder for PromQL expressions
///
/// ```rust
/// use promsql::QueryBuilder;
///
/// let query = QueryBuilder::new()
///     .metric(&["http_requests_total"])?
///     .eq("job", "api")?
///     .rate("5m")?
///     .sum(&["instance"])
///     .build();
///
/// assert_eq!(query, r#"sum by(instance)(rate(http_requests_total{job="api"}[5m]))"#);
/// # Ok::<(), promsql::QueryError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    ledger: Ledger,
}

impl QueryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded operations
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn push(mut self, op: Op) -> Self {
        self.ledger.push(op);
        self
    }

    /// Select one or more metrics.
    ///
    /// Several names (across all `metric` calls) are rendered as a
    /// `__name__=~"a|b"` matcher placed ahead of every other label.
    pub fn metric(self, names: &[&str]) -> QueryResult<Self> {
        ensure_not_empty(names, "metrics")?;
        for name in names {
            ensure_not_blank(name, "metrics")?;
        }
        Ok(self.push(Op::Metric(names.iter().map(|n| n.to_string()).collect())))
    }

    /// Shift the selected window back in time, e.g. `5m` or `-1w`
    pub fn offset(self, offset: &str) -> QueryResult<Self> {
        ensure_not_blank(offset, "offset")?;
        Ok(self.push(Op::Offset(offset.to_string())))
    }

    // ----- label filters -----

    fn label(
        self,
        condition: bool,
        matcher: Matcher,
        label: &str,
        value: &str,
    ) -> QueryResult<Self> {
        ensure_not_blank(label, "label")?;
        if !condition {
            return Ok(self);
        }
        Ok(self.push(Op::Label {
            matcher,
            label: label.to_string(),
            value: value.to_string(),
        }))
    }

    /// `label="value"`
    pub fn eq(self, label: &str, value: &str) -> QueryResult<Self> {
        self.eq_if(true, label, value)
    }

    /// `label="value"` when `condition` holds
    pub fn eq_if(self, condition: bool, label: &str, value: &str) -> QueryResult<Self> {
        self.label(condition, Matcher::Eq, label, value)
    }

    /// `label!="value"`
    pub fn not_eq(self, label: &str, value: &str) -> QueryResult<Self> {
        self.not_eq_if(true, label, value)
    }

    /// `label!="value"` when `condition` holds
    pub fn not_eq_if(self, condition: bool, label: &str, value: &str) -> QueryResult<Self> {
        self.label(condition, Matcher::NotEq, label, value)
    }

    /// `label=""`, series where the label is absent or empty
    pub fn empty(self, label: &str) -> QueryResult<Self> {
        self.eq(label, "")
    }

    /// `label=""` when `condition` holds
    pub fn empty_if(self, condition: bool, label: &str) -> QueryResult<Self> {
        self.eq_if(condition, label, "")
    }

    /// `label!=""`
    pub fn not_empty(self, label: &str) -> QueryResult<Self> {
        self.not_eq(label, "")
    }

    /// `label!=""` when `condition` holds
    pub fn not_empty_if(self, condition: bool, label: &str) -> QueryResult<Self> {
        self.not_eq_if(condition, label, "")
    }

    /// `label=~"pattern"`
    pub fn regex(self, label: &str, pattern: &str) -> QueryResult<Self> {
        self.regex_if(true, label, pattern)
    }

    /// `label=~"pattern"` when `condition` holds
    pub fn regex_if(self, condition: bool, label: &str, pattern: &str) -> QueryResult<Self> {
        self.label(condition, Matcher::Regex, label, pattern)
    }

    /// `label!~"pattern"`
    pub fn not_regex(self, label: &str, pattern: &str) -> QueryResult<Self> {
        self.not_regex_if(true, label, pattern)
    }

    /// `label!~"pattern"` when `condition` holds
    pub fn not_regex_if(self, condition: bool, label: &str, pattern: &str) -> QueryResult<Self> {
        self.label(condition, Matcher::NotRegex, label, pattern)
    }

    // ----- aggregation -----

    fn grouped(self, op: &str, grouping: Grouping, labels: &[&str]) -> Self {
        let template = if labels.is_empty() {
            Template::call(op)
        } else {
            Template::new(
                format!("{} {}({})(", op, grouping.as_str(), labels.join(", ")),
                ")",
            )
        };
        self.push(Op::Agg(template))
    }

    /// Wrap in `<op> by|without(<labels>)(...)`, or `<op>(...)` with no labels
    pub fn aggregate(self, op: Aggregation, grouping: Grouping, labels: &[&str]) -> Self {
        self.grouped(op.as_str(), grouping, labels)
    }

    /// Like [`aggregate`](Self::aggregate) for operators not covered by
    /// [`Aggregation`], e.g. `limitk`
    pub fn aggregate_named(
        self,
        op: &str,
        grouping: Grouping,
        labels: &[&str],
    ) -> QueryResult<Self> {
        ensure_not_blank(op, "aggregation")?;
        Ok(self.grouped(op, grouping, labels))
    }

    /// Sum over `by(<labels>)`, or over everything with no labels
    pub fn sum(self, by: &[&str]) -> Self {
        self.aggregate(Aggregation::Sum, Grouping::By, by)
    }

    /// Sum `without(<labels>)`
    pub fn sum_without(self, without: &[&str]) -> Self {
        self.aggregate(Aggregation::Sum, Grouping::Without, without)
    }

    /// Minimum over `by(<labels>)`, or over everything with no labels
    pub fn min(self, by: &[&str]) -> Self {
        self.aggregate(Aggregation::Min, Grouping::By, by)
    }

    /// Minimum `without(<labels>)`
    pub fn min_without(self, without: &[&str]) -> Self {
        self.aggregate(Aggregation::Min, Grouping::Without, without)
    }

    /// Maximum over `by(<labels>)`, or over everything with no labels
    pub fn max(self, by: &[&str]) -> Self {
        self.aggregate(Aggregation::Max, Grouping::By, by)
    }

    /// Maximum `without(<labels>)`
    pub fn max_without(self, without: &[&str]) -> Self {
        self.aggregate(Aggregation::Max, Grouping::Without, without)
    }

    /// Average over `by(<labels>)`, or over everything with no labels
    pub fn avg(self, by: &[&str]) -> Self {
        self.aggregate(Aggregation::Avg, Grouping::By, by)
    }

    /// Average `without(<labels>)`
    pub fn avg_without(self, without: &[&str]) -> Self {
        self.aggregate(Aggregation::Avg, Grouping::Without, without)
    }

    /// Count over `by(<labels>)`, or over everything with no labels
    pub fn count(self, by: &[&str]) -> Self {
        self.aggregate(Aggregation::Count, Grouping::By, by)
    }

    /// Count `without(<labels>)`
    pub fn count_without(self, without: &[&str]) -> Self {
        self.aggregate(Aggregation::Count, Grouping::Without, without)
    }

    /// `count_values("label", ...)`
    pub fn count_values(self, label: &str) -> QueryResult<Self> {
        ensure_not_blank(label, "label")?;
        Ok(self.push(Op::Agg(Template::call_with_param(
            "count_values",
            format!("\"{}\"", label),
        ))))
    }

    /// `topk(k, ...)`
    pub fn topk(self, k: u32) -> Self {
        self.push(Op::Agg(Template::call_with_param("topk", k)))
    }

    /// `bottomk(k, ...)`
    pub fn bottomk(self, k: u32) -> Self {
        self.push(Op::Agg(Template::call_with_param("bottomk", k)))
    }

    /// `quantile(phi, ...)`
    pub fn quantile(self, phi: f64) -> Self {
        self.push(Op::Agg(Template::call_with_param("quantile", phi)))
    }

    // ----- functions -----

    /// `rate(...[range])`
    pub fn rate(self, range: &str) -> QueryResult<Self> {
        self.func_range("rate", range)
    }

    /// `irate(...[range])`
    pub fn irate(self, range: &str) -> QueryResult<Self> {
        self.func_range("irate", range)
    }

    /// `delta(...[range])`
    pub fn delta(self, range: &str) -> QueryResult<Self> {
        self.func_range("delta", range)
    }

    /// `abs(...)`
    pub fn abs(self) -> Self {
        self.push(Op::Agg(Template::call("abs")))
    }

    /// `absent(...)`
    pub fn absent(self) -> Self {
        self.push(Op::Agg(Template::call("absent")))
    }

    /// `ceil(...)`
    pub fn ceil(self) -> Self {
        self.push(Op::Agg(Template::call("ceil")))
    }

    /// `floor(...)`
    pub fn floor(self) -> Self {
        self.push(Op::Agg(Template::call("floor")))
    }

    /// Wrap in an arbitrary single-argument function, e.g. `sqrt`
    pub fn func(self, name: &str) -> QueryResult<Self> {
        ensure_not_blank(name, "function")?;
        Ok(self.push(Op::Agg(Template::call(name))))
    }

    /// Wrap in a range-vector function, e.g. `avg_over_time` with `1h`.
    ///
    /// Only the first range function of a query places its `[range]`
    /// window; later ones still wrap the expression but add no window.
    pub fn func_range(self, name: &str, range: &str) -> QueryResult<Self> {
        ensure_not_blank(name, "function")?;
        ensure_not_blank(range, "duration")?;
        Ok(self.push(Op::RangeAgg {
            template: Template::call(name),
            range: range.to_string(),
        }))
    }

    /// Append raw text after the whole expression, e.g. ` / 1024`
    pub fn last(self, suffix: &str) -> Self {
        self.push(Op::Last(suffix.to_string()))
    }

    /// Assemble the expression
    pub fn build(&self) -> String {
        let query = assemble(&self.ledger);
        tracing::debug!(ops = self.ledger.len(), query = %query, "Assembled query");
        query
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&assemble(&self.ledger))
    }
}

/// Start a new [`QueryBuilder`]
pub fn builder() -> QueryBuilder {
    QueryBuilder::new()
}
