//! Conditional expression mini-language.
//!
//! `ifExpr` strings are a small boolean language over row columns:
//!
//! ```text
//! status == 'ACTIVE' && (balance > 0 || overdraft_flag == 'Y')
//! ```
//!
//! Expressions are compiled once per mapping into an [`Expr`] AST when the
//! engine is constructed, then evaluated per row. Parsing never happens on the
//! row path.
//!
//! Precedence, tightest first: `!`, comparison, `&&`, `||`; parentheses group
//! explicitly; same-precedence chains associate left to right.

pub mod eval;
pub mod parser;

pub use eval::{evaluate, truthy, EvalContext};
pub use parser::parse;

use rust_decimal::Decimal;

/// A literal atom in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// Quoted string literal.
    Str(String),
    /// Bare number literal.
    Num(Decimal),
    /// The `null` keyword.
    Null,
}

/// Comparison operators. `=` parses as a synonym of `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare identifier resolved against the row, case-insensitively.
    Field(String),
    /// Literal atom.
    Literal(Atom),
    /// Prefix `!`.
    Not(Box<Expr>),
    /// Binary comparison.
    Compare { lhs: Box<Expr>, op: CmpOp, rhs: Box<Expr> },
    /// Short-circuit `&&`.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit `||`.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Append every field reference in the tree to `out` (with duplicates;
    /// callers dedup).
    pub fn collect_field_refs(&self, out: &mut Vec<String>) {
        match self {
            Expr::Field(name) => out.push(name.clone()),
            Expr::Literal(_) => {}
            Expr::Not(inner) => inner.collect_field_refs(out),
            Expr::Compare { lhs, rhs, .. } => {
                lhs.collect_field_refs(out);
                rhs.collect_field_refs(out);
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_field_refs(out);
                r.collect_field_refs(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_field_refs() {
        let expr = parse("status == 'ACTIVE' && (balance > 100 || !vip_flag)").unwrap();
        let mut refs = Vec::new();
        expr.collect_field_refs(&mut refs);
        assert_eq!(refs, vec!["status", "balance", "vip_flag"]);
    }
}
