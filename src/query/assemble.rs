//! Assembly engine
//!
//! Turns a [`Ledger`] into the final expression in five phases:
//!
//! ```text
//! 1. metric     one name -> base expression; otherwise __name__=~"a|b" matcher
//! 2. labels     {l1="v1", l2!="v2"} appended when any label exists
//! 3. window     remember where a range window goes, then " offset <x>"
//! 4. wrapping   every Agg/RangeAgg in call order, earliest innermost
//! 5. suffix     first Last appended verbatim
//! ```
//!
//! The ledger is only read. The synthesized `__name__` matcher lives in a
//! derived label list, so assembling the same ledger twice gives the same
//! string.

use super::ops::{LabelRef, Ledger, Matcher, Op};

/// Label carrying the metric name in a selector
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Assemble the expression described by `ledger`
pub fn assemble(ledger: &Ledger) -> String {
    let names = ledger.metric_names();
    let joined;

    // Phase 1: metric resolution
    let (mut expr, synthesized) = match names.as_slice() {
        [name] => ((*name).to_string(), None),
        // none or several: the selector comes from the __name__ matcher alone
        _ => {
            joined = names.join("|");
            let matcher = LabelRef {
                matcher: Matcher::Regex,
                label: METRIC_NAME_LABEL,
                value: &joined,
            };
            (String::new(), Some(matcher))
        }
    };

    // Phase 2: label block
    let labels: Vec<String> = synthesized
        .into_iter()
        .chain(ledger.labels())
        .map(|label| label.to_string())
        .collect();
    if !labels.is_empty() {
        expr.push('{');
        expr.push_str(&labels.join(", "));
        expr.push('}');
    }

    // Phase 3: range window position and offset
    let mut window_at = Some(expr.len());
    if let Some(offset) = ledger.first_offset() {
        expr.push_str(" offset ");
        expr.push_str(offset);
    }

    // Phase 4: wrapping in call order
    for op in ledger.iter() {
        let Some(template) = op.template() else {
            continue;
        };
        expr = template.wrap(&expr);
        if let Some(at) = window_at.as_mut() {
            *at += template.head().len();
        }
        if let Op::RangeAgg { range, .. } = op {
            // Only the first range function gets a window
            if let Some(at) = window_at.take() {
                expr.insert_str(at, &format!("[{}]", range));
            }
        }
    }

    // Phase 5: trailing suffix
    if let Some(last) = ledger.first_last() {
        expr.push_str(last);
    }

    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ops::Template;

    fn metric(names: &[&str]) -> Op {
        Op::Metric(names.iter().map(|n| n.to_string()).collect())
    }

    fn label(matcher: Matcher, label: &str, value: &str) -> Op {
        Op::Label {
            matcher,
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    fn ledger(ops: Vec<Op>) -> Ledger {
        let mut ledger = Ledger::new();
        for op in ops {
            ledger.push(op);
        }
        ledger
    }

    #[test]
    fn test_single_metric_is_literal() {
        let ledger = ledger(vec![metric(&["up"])]);
        assert_eq!(assemble(&ledger), "up");
    }

    #[test]
    fn test_empty_ledger() {
        assert_eq!(assemble(&Ledger::new()), r#"{__name__=~""}"#);
    }

    #[test]
    fn test_labels_without_metric() {
        let ledger = ledger(vec![label(Matcher::Eq, "job", "api")]);
        assert_eq!(assemble(&ledger), r#"{__name__=~"", job="api"}"#);
    }

    #[test]
    fn test_multi_metric_matcher_comes_first() {
        let ledger = ledger(vec![
            label(Matcher::Eq, "user", "24"),
            metric(&["a", "b"]),
            label(Matcher::NotEq, "cluster", "x"),
        ]);
        assert_eq!(
            assemble(&ledger),
            r#"{__name__=~"a|b", user="24", cluster!="x"}"#
        );
    }

    #[test]
    fn test_assemble_does_not_touch_ledger() {
        let ledger = ledger(vec![metric(&["a", "b"]), Op::Agg(Template::call("sum"))]);
        let before = ledger.clone();

        let first = assemble(&ledger);
        let second = assemble(&ledger);

        assert_eq!(first, r#"sum({__name__=~"a|b"})"#);
        assert_eq!(first, second);
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_window_lands_before_offset() {
        let ledger = ledger(vec![
            metric(&["up"]),
            Op::Offset("1w".to_string()),
            Op::RangeAgg {
                template: Template::call("rate"),
                range: "5m".to_string(),
            },
        ]);
        assert_eq!(assemble(&ledger), "rate(up[5m] offset 1w)");
    }

    #[test]
    fn test_window_after_outer_wraps() {
        // the range function is not the innermost wrap
        let ledger = ledger(vec![
            metric(&["up"]),
            Op::Agg(Template::call("abs")),
            Op::RangeAgg {
                template: Template::call("max_over_time"),
                range: "1h".to_string(),
            },
        ]);
        assert_eq!(assemble(&ledger), "max_over_time(abs(up[1h]))");
    }

    #[test]
    fn test_second_range_function_has_no_window() {
        let ledger = ledger(vec![
            metric(&["up"]),
            Op::RangeAgg {
                template: Template::call("rate"),
                range: "5m".to_string(),
            },
            Op::RangeAgg {
                template: Template::call("delta"),
                range: "1h".to_string(),
            },
        ]);
        assert_eq!(assemble(&ledger), "delta(rate(up[5m]))");
    }

    #[test]
    fn test_suffix_after_all_wraps() {
        let ledger = ledger(vec![
            Op::Last(" > 0".to_string()),
            metric(&["up"]),
            Op::Agg(Template::call("sum")),
            Op::Last(" < 10".to_string()),
        ]);
        assert_eq!(assemble(&ledger), "sum(up) > 0");
    }

    #[test]
    fn test_label_value_resembling_placeholder_kept() {
        let ledger = ledger(vec![
            metric(&["up"]),
            label(Matcher::Eq, "tpl", "${duration}"),
        ]);
        assert_eq!(assemble(&ledger), r#"up{tpl="${duration}"}"#);
    }
}
