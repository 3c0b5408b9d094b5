//! Expression evaluation against one source row.
//!
//! Evaluation is total: a sub-expression that cannot be evaluated as intended
//! (type mismatch, unparseable operand of a relational operator) evaluates to
//! `false` and pushes a warning diagnostic, so one bad row never aborts a
//! batch. `&&` and `||` short-circuit; the right operand of a decided
//! connective is never touched, so it may reference absent columns freely.

use std::cmp::Ordering;

use crate::config::DataType;
use crate::row::{Row, Value};

use super::{Atom, CmpOp, Expr};

/// Typing context for coercions: the declared type of the mapping that owns
/// the expression, and its (already translated) chrono date pattern.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub data_type: DataType,
    /// chrono pattern used to parse date operands; ISO by default.
    pub date_format: &'a str,
}

impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self {
            data_type: DataType::String,
            date_format: "%Y-%m-%d",
        }
    }
}

/// Evaluate a compiled expression to a boolean. Degraded sub-expressions
/// evaluate to `false` and are reported through `diags`.
pub fn evaluate(expr: &Expr, row: &Row, ctx: &EvalContext<'_>, diags: &mut Vec<String>) -> bool {
    match expr {
        Expr::And(lhs, rhs) => {
            if !evaluate(lhs, row, ctx, diags) {
                false
            } else {
                evaluate(rhs, row, ctx, diags)
            }
        }
        Expr::Or(lhs, rhs) => {
            if evaluate(lhs, row, ctx, diags) {
                true
            } else {
                evaluate(rhs, row, ctx, diags)
            }
        }
        Expr::Not(inner) => !evaluate(inner, row, ctx, diags),
        Expr::Compare { lhs, op, rhs } => {
            let lhs = operand_value(lhs, row, ctx, diags);
            let rhs = operand_value(rhs, row, ctx, diags);
            compare(&lhs, *op, &rhs, ctx, diags)
        }
        Expr::Field(_) | Expr::Literal(_) => truthy(&operand_value(expr, row, ctx, diags)),
    }
}

/// Truthiness of a bare (non-comparison) operand.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Str(s) => !s.trim().is_empty(),
        Value::Number(n) => !n.is_zero(),
        Value::Date(_) => true,
    }
}

fn operand_value(expr: &Expr, row: &Row, ctx: &EvalContext<'_>, diags: &mut Vec<String>) -> Value {
    match expr {
        Expr::Field(name) => row.get(name).cloned().unwrap_or(Value::Null),
        Expr::Literal(Atom::Str(s)) => Value::Str(s.clone()),
        Expr::Literal(Atom::Num(n)) => Value::Number(*n),
        Expr::Literal(Atom::Null) => Value::Null,
        // A parenthesized boolean expression used as a comparison operand.
        nested => Value::Bool(evaluate(nested, row, ctx, diags)),
    }
}

fn compare(lhs: &Value, op: CmpOp, rhs: &Value, ctx: &EvalContext<'_>, diags: &mut Vec<String>) -> bool {
    match op {
        CmpOp::Eq => equals(lhs, rhs, ctx),
        CmpOp::Ne => !equals(lhs, rhs, ctx),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => match relate(lhs, rhs, ctx) {
            Some(ord) => holds(ord, op),
            None => {
                diags.push(format!(
                    "cannot evaluate '{}' {} '{}'; sub-expression treated as false",
                    lhs.as_string(),
                    op.symbol(),
                    rhs.as_string(),
                ));
                false
            }
        },
    }
}

/// Equality with null/blank semantics: a null or blank value satisfies
/// `== null` and `== ''` checks.
///
/// Coercion is gated on the mapping's declared type: only number-typed
/// mappings compare numerically and only date-typed mappings compare as
/// dates. A string-typed field keeps leading zeros significant, so a branch
/// code `"7"` never equals `'007'`.
fn equals(lhs: &Value, rhs: &Value, ctx: &EvalContext<'_>) -> bool {
    if lhs.is_empty() || rhs.is_empty() {
        return lhs.is_empty() && rhs.is_empty();
    }
    match ctx.data_type {
        DataType::Number => {
            if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
                return a == b;
            }
        }
        DataType::Date => {
            if let (Some(a), Some(b)) = (lhs.as_date(ctx.date_format), rhs.as_date(ctx.date_format)) {
                return a == b;
            }
        }
        DataType::String | DataType::Boolean => {}
    }
    lhs.as_string() == rhs.as_string()
}

/// Ordering for relational operators. A number-typed mapping demands numeric
/// operands and a date-typed mapping demands date operands; otherwise numeric
/// comparison applies when both sides coerce to numbers, with lexical
/// comparison as the fallback. `None` means the comparison is undecidable and
/// evaluates to false.
fn relate(lhs: &Value, rhs: &Value, ctx: &EvalContext<'_>) -> Option<Ordering> {
    match ctx.data_type {
        DataType::Number => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
        DataType::Date => match (lhs.as_date(ctx.date_format), rhs.as_date(ctx.date_format)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
        DataType::String | DataType::Boolean => {
            if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
                return Some(a.cmp(&b));
            }
            if lhs.is_empty() || rhs.is_empty() {
                return None;
            }
            Some(lhs.as_string().cmp(&rhs.as_string()))
        }
    }
}

fn holds(ord: Ordering, op: CmpOp) -> bool {
    match op {
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
        CmpOp::Eq | CmpOp::Ne => unreachable!("equality handled separately"),
    }
}
