//! Value resolution: produce the raw (pre-format) value of one field.
//!
//! Resolution dispatches on the mapping's transformation type. Missing source
//! data degrades gracefully to the mapping's `defaultValue` (or the empty
//! string) rather than erroring; whether an empty required field kills the
//! record is the assembler's call, not the resolver's.
//!
//! Conditional expressions arrive here already compiled; the resolver only
//! evaluates.

use rust_decimal::Decimal;

use crate::config::{CompositeOp, FieldMapping, Transformation};
use crate::expr::{self, evaluate, EvalContext, Expr};
use crate::row::Row;

// =============================================================================
// Compiled rules
// =============================================================================

/// A mapping's transformation with every conditional expression parsed once.
#[derive(Debug, Clone)]
pub(crate) enum CompiledRule {
    Source {
        source_field: String,
    },
    Constant {
        value: String,
    },
    Composite {
        sources: Vec<String>,
        transform: CompositeOp,
        delimiter: String,
    },
    Conditional {
        chains: Vec<CompiledChain>,
    },
    Blank,
}

/// One if/else-if/else chain with its branch expressions compiled, flattened
/// into evaluation order.
#[derive(Debug, Clone)]
pub(crate) struct CompiledChain {
    branches: Vec<(Expr, String)>,
    else_value: Option<String>,
}

/// Compile a transformation, parsing all conditional expressions. Returns the
/// full list of parse failures so the validator can report every broken
/// expression at once.
pub(crate) fn compile(transformation: &Transformation) -> Result<CompiledRule, Vec<String>> {
    match transformation {
        Transformation::Source { source_field } => Ok(CompiledRule::Source {
            source_field: source_field.clone(),
        }),
        Transformation::Constant { value } => Ok(CompiledRule::Constant { value: value.clone() }),
        Transformation::Composite { sources, transform, delimiter } => Ok(CompiledRule::Composite {
            sources: sources.clone(),
            transform: *transform,
            delimiter: delimiter.clone().unwrap_or_default(),
        }),
        Transformation::Blank => Ok(CompiledRule::Blank),
        Transformation::Conditional { conditions } => {
            let mut errors = Vec::new();
            let mut chains = Vec::new();
            for cond in conditions {
                let mut branches = Vec::new();
                let mut chain_exprs = vec![(cond.if_expr.as_str(), cond.then.as_str())];
                chain_exprs.extend(cond.else_ifs.iter().map(|e| (e.if_expr.as_str(), e.then.as_str())));
                for (if_expr, then) in chain_exprs {
                    match expr::parse(if_expr) {
                        Ok(parsed) => branches.push((parsed, then.to_string())),
                        Err(e) => errors.push(format!("ifExpr '{if_expr}' does not parse: {e}")),
                    }
                }
                chains.push(CompiledChain {
                    branches,
                    else_value: cond.else_value.clone(),
                });
            }
            if errors.is_empty() {
                Ok(CompiledRule::Conditional { chains })
            } else {
                Err(errors)
            }
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve a field's raw value against one row. Expression-evaluation
/// problems are appended to `diags`; resolution itself never fails.
pub(crate) fn resolve(
    rule: &CompiledRule,
    mapping: &FieldMapping,
    row: &Row,
    ctx: &EvalContext<'_>,
    diags: &mut Vec<String>,
) -> String {
    match rule {
        CompiledRule::Source { source_field } => row
            .get_non_empty(source_field)
            .map(|v| v.as_string())
            .or_else(|| mapping.default_value.clone())
            .unwrap_or_default(),

        CompiledRule::Constant { value } => {
            if value.trim().is_empty() {
                mapping.default_value.clone().unwrap_or_else(|| value.clone())
            } else {
                value.clone()
            }
        }

        CompiledRule::Blank => mapping.default_value.clone().unwrap_or_default(),

        CompiledRule::Composite { sources, transform, delimiter } => {
            let built = match transform {
                CompositeOp::Concat => concat(sources, delimiter, row),
                CompositeOp::Sum => sum(sources, row),
            };
            if built.is_empty() {
                mapping.default_value.clone().unwrap_or(built)
            } else {
                built
            }
        }

        CompiledRule::Conditional { chains } => {
            for chain in chains {
                for (expr, then) in &chain.branches {
                    if evaluate(expr, row, ctx, diags) {
                        return resolve_then(then, row);
                    }
                }
                if let Some(else_value) = &chain.else_value {
                    return resolve_then(else_value, row);
                }
            }
            mapping.default_value.clone().unwrap_or_default()
        }
    }
}

/// Join the resolved component values in declared order. Missing or blank
/// components are skipped, never aborts: a composite with some columns
/// present still produces a partial joined value.
fn concat(sources: &[String], delimiter: &str, row: &Row) -> String {
    let parts: Vec<String> = sources
        .iter()
        .filter_map(|s| row.get_non_empty(s))
        .map(|v| v.as_string())
        .collect();
    parts.join(delimiter)
}

/// Decimal sum of the component values. Non-numeric components count as zero;
/// monetary precision is preserved by the decimal accumulator.
fn sum(sources: &[String], row: &Row) -> String {
    let total: Decimal = sources
        .iter()
        .map(|s| {
            row.get(s)
                .and_then(|v| v.as_number())
                .unwrap_or(Decimal::ZERO)
        })
        .sum();
    total.normalize().to_string()
}

/// A `then` that names a row column resolves as a field reference; a quoted
/// string is taken literally with the quotes stripped; anything else is a
/// bare literal.
fn resolve_then(then: &str, row: &Row) -> String {
    let trimmed = then.trim();
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    if row.contains(trimmed) {
        return row.get(trimmed).map(|v| v.as_string()).unwrap_or_default();
    }
    then.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Condition, FieldMapping};
    use crate::row::Value;

    fn resolved(mapping: &FieldMapping, row: &Row) -> (String, Vec<String>) {
        let rule = compile(&mapping.transformation).unwrap();
        let mut diags = Vec::new();
        let ctx = EvalContext::default();
        (resolve(&rule, mapping, row, &ctx, &mut diags), diags)
    }

    #[test]
    fn test_source_lookup_case_insensitive() {
        let mapping = FieldMapping::source("acct", "acct_num", 1, 18);
        let row = Row::new([("ACCT_NUM", "123456789012345678")]);
        assert_eq!(resolved(&mapping, &row).0, "123456789012345678");
    }

    #[test]
    fn test_source_missing_falls_back_to_default_then_empty() {
        let with_default = FieldMapping::source("branch", "branch_code", 1, 4).with_default("0000");
        let without = FieldMapping::source("branch", "branch_code", 1, 4);
        let row = Row::new([("OTHER", "x")]);
        assert_eq!(resolved(&with_default, &row).0, "0000");
        assert_eq!(resolved(&without, &row).0, "");
    }

    #[test]
    fn test_constant_blank_falls_back_to_default() {
        let mapping = FieldMapping::constant("filler", "", 1, 2).with_default("--");
        let row = Row::default();
        assert_eq!(resolved(&mapping, &row).0, "--");

        let verbatim = FieldMapping::constant("rec", "000001", 1, 6);
        assert_eq!(resolved(&verbatim, &row).0, "000001");
    }

    #[test]
    fn test_blank_ignores_row() {
        let mapping = FieldMapping::blank("filler", 1, 5).with_default("     ");
        let row = Row::new([("FILLER", "should not matter")]);
        assert_eq!(resolved(&mapping, &row).0, "     ");
    }

    #[test]
    fn test_concat_in_declared_order() {
        let mapping = FieldMapping::composite(
            "name",
            vec!["first_name".into(), "last_name".into()],
            CompositeOp::Concat,
            1,
            30,
        )
        .with_delimiter(" ");
        let row = Row::new([("LAST_NAME", "Doe"), ("FIRST_NAME", "Jane")]);
        assert_eq!(resolved(&mapping, &row).0, "Jane Doe");
    }

    #[test]
    fn test_concat_skips_missing_components() {
        let mapping = FieldMapping::composite(
            "name",
            vec!["first_name".into(), "middle_name".into(), "last_name".into()],
            CompositeOp::Concat,
            1,
            30,
        )
        .with_delimiter(" ");
        let row = Row::new([("FIRST_NAME", "Jane"), ("LAST_NAME", "Doe")]);
        assert_eq!(resolved(&mapping, &row).0, "Jane Doe");
    }

    #[test]
    fn test_sum_treats_non_numeric_as_zero() {
        let mapping = FieldMapping::composite(
            "total",
            vec!["fee_a".into(), "fee_b".into(), "fee_c".into()],
            CompositeOp::Sum,
            1,
            10,
        );
        let row = Row::new([("FEE_A", "10.25"), ("FEE_B", "oops"), ("FEE_C", "5.50")]);
        assert_eq!(resolved(&mapping, &row).0, "15.75");
    }

    #[test]
    fn test_sum_monetary_precision() {
        let mapping = FieldMapping::composite(
            "total",
            vec!["a".into(), "b".into(), "c".into()],
            CompositeOp::Sum,
            1,
            10,
        );
        // 0.1 + 0.2 must be exactly 0.3 in a decimal accumulator.
        let row = Row::new([("A", "0.1"), ("B", "0.2"), ("C", "0")]);
        assert_eq!(resolved(&mapping, &row).0, "0.3");
    }

    #[test]
    fn test_conditional_first_match_wins() {
        // Both branches true: the first must win, always.
        let mapping = FieldMapping::conditional(
            "tier",
            vec![Condition::new("balance >= 0", "x")
                .with_else_if("balance >= 0", "y")
                .with_else("z")],
            1,
            1,
        );
        let row = Row::new([("BALANCE", "100")]);
        assert_eq!(resolved(&mapping, &row).0, "x");
    }

    #[test]
    fn test_conditional_else_and_default() {
        let with_else = FieldMapping::conditional(
            "flag",
            vec![Condition::new("status == 'ACTIVE'", "A").with_else("I")],
            1,
            1,
        );
        let no_else = FieldMapping::conditional(
            "flag",
            vec![Condition::new("status == 'ACTIVE'", "A")],
            1,
            1,
        )
        .with_default("U");

        let inactive = Row::new([("STATUS", "INACTIVE")]);
        assert_eq!(resolved(&with_else, &inactive).0, "I");
        assert_eq!(resolved(&no_else, &inactive).0, "U");

        // Missing column falls through to else as well.
        let empty = Row::default();
        assert_eq!(resolved(&with_else, &empty).0, "I");
    }

    #[test]
    fn test_conditional_then_as_field_reference() {
        let mapping = FieldMapping::conditional(
            "display_name",
            vec![Condition::new("nickname != null", "nickname").with_else("legal_name")],
            1,
            20,
        );
        let with_nick = Row::new([("NICKNAME", "JJ"), ("LEGAL_NAME", "Jane Jones")]);
        assert_eq!(resolved(&mapping, &with_nick).0, "JJ");

        let without = Row::new([("NICKNAME", Value::Null), ("LEGAL_NAME", Value::Str("Jane Jones".into()))]);
        assert_eq!(resolved(&mapping, &without).0, "Jane Jones");
    }

    #[test]
    fn test_conditional_quoted_then_is_literal() {
        // Quoted, so never a column lookup even when a column of that name exists.
        let mapping = FieldMapping::conditional(
            "flag",
            vec![Condition::new("status == 'ACTIVE'", "'status'")],
            1,
            6,
        );
        let row = Row::new([("STATUS", "ACTIVE")]);
        assert_eq!(resolved(&mapping, &row).0, "status");
    }

    #[test]
    fn test_compile_reports_every_broken_expression() {
        let t = Transformation::Conditional {
            conditions: vec![
                Condition::new("&&", "a").with_else_if("== 5", "b"),
                Condition::new("status == 'OK'", "c"),
            ],
        };
        let errors = compile(&t).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
