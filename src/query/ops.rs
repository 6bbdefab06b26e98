//! Operation ledger
//!
//! Builder calls are recorded as [`Op`] values in an append-only [`Ledger`].
//! Nothing is computed on append; the assembly engine reads the ledger
//! once per `build()`, either positionally (wrapping operations) or through
//! the typed first-match scans below (metric, label, offset, last).

use std::fmt;

/// Label matching operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `=~`
    Regex,
    /// `!~`
    NotRegex,
}

impl Matcher {
    /// The operator as it appears inside a selector
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Regex => "=~",
            Self::NotRegex => "!~",
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call template with exactly one hole for the wrapped expression.
///
/// The hole is structural (text before and after it), so a template can
/// never carry zero or two substitution points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    head: String,
    tail: String,
}

impl Template {
    /// Create a template from the text surrounding the hole
    pub fn new(head: impl Into<String>, tail: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            tail: tail.into(),
        }
    }

    /// `name(<expr>)`
    pub fn call(name: &str) -> Self {
        Self::new(format!("{}(", name), ")")
    }

    /// `name(<param>, <expr>)`
    pub fn call_with_param(name: &str, param: impl fmt::Display) -> Self {
        Self::new(format!("{}({}, ", name, param), ")")
    }

    /// Text placed before the wrapped expression
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Text placed after the wrapped expression
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Substitute `expr` into the hole
    pub fn wrap(&self, expr: &str) -> String {
        let mut out = String::with_capacity(self.head.len() + expr.len() + self.tail.len());
        out.push_str(&self.head);
        out.push_str(expr);
        out.push_str(&self.tail);
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%s{}", self.head, self.tail)
    }
}

/// A single recorded builder operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Primary time series names; more than one collapses into a `__name__` regex
    Metric(Vec<String>),
    /// A label-match clause
    Label {
        matcher: Matcher,
        label: String,
        value: String,
    },
    /// Aggregation or function call wrapping the current expression
    Agg(Template),
    /// Wrapping call that also resolves the pending range window
    RangeAgg { template: Template, range: String },
    /// Time shift applied right after the selector
    Offset(String),
    /// Raw text appended after everything else
    Last(String),
}

impl Op {
    /// The wrapping template, for `Agg` and `RangeAgg`
    pub fn template(&self) -> Option<&Template> {
        match self {
            Self::Agg(template) | Self::RangeAgg { template, .. } => Some(template),
            _ => None,
        }
    }
}

/// A borrowed view of a label clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRef<'a> {
    pub matcher: Matcher,
    pub label: &'a str,
    pub value: &'a str,
}

impl fmt::Display for LabelRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\"{}\"", self.label, self.matcher, self.value)
    }
}

/// Append-only sequence of operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    ops: Vec<Op>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Number of recorded operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All operations in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }

    /// Metric names across every `Metric` op, flattened in call order
    pub fn metric_names(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Metric(names) => Some(names),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Label clauses in ledger order
    pub fn labels(&self) -> impl Iterator<Item = LabelRef<'_>> {
        self.ops.iter().filter_map(|op| match op {
            Op::Label {
                matcher,
                label,
                value,
            } => Some(LabelRef {
                matcher: *matcher,
                label,
                value,
            }),
            _ => None,
        })
    }

    /// The first recorded offset; later ones are ignored
    pub fn first_offset(&self) -> Option<&str> {
        self.ops.iter().find_map(|op| match op {
            Op::Offset(offset) => Some(offset.as_str()),
            _ => None,
        })
    }

    /// The first recorded trailing suffix; later ones are ignored
    pub fn first_last(&self) -> Option<&str> {
        self.ops.iter().find_map(|op| match op {
            Op::Last(last) => Some(last.as_str()),
            _ => None,
        })
    }
}
