//! nom parser for the conditional expression language.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expression := and_expr ( "||" and_expr )*
//! and_expr   := not_expr ( "&&" not_expr )*
//! not_expr   := "!" not_expr | comparison
//! comparison := operand ( cmp_op operand )?
//! operand    := "(" expression ")" | literal | identifier
//! cmp_op     := "==" | "=" | "!=" | "<=" | ">=" | "<" | ">"
//! literal    := 'string' | "string" | number | null
//! ```
//!
//! Bare identifiers are field references; `null` is the null literal.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, map, not, opt, recognize, value},
    error::ParseError as NomParseError,
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{Atom, CmpOp, Expr};

// ============================================================================
// Public API
// ============================================================================

/// Parse one expression string into an [`Expr`].
///
/// The whole input must be consumed; trailing garbage is an error. Errors are
/// rendered as human-readable strings for the configuration validator.
pub fn parse(input: &str) -> Result<Expr, String> {
    match all_consuming(delimited(
        multispace0::<_, nom::error::VerboseError<&str>>,
        expression,
        multispace0,
    ))(input)
    {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("incomplete expression".to_string()),
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn expression<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, tag("||"), multispace0),
        and_expr,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| Expr::Or(Box::new(lhs), Box::new(rhs))),
    ))
}

fn and_expr<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, tag("&&"), multispace0),
        not_expr,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| Expr::And(Box::new(lhs), Box::new(rhs))),
    ))
}

fn not_expr<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    alt((
        // `!` prefix, but not the first char of `!=`
        map(
            preceded(tuple((char('!'), not(char('=')), multispace0)), not_expr),
            |inner| Expr::Not(Box::new(inner)),
        ),
        comparison,
    ))(input)
}

fn comparison<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (input, lhs) = operand(input)?;
    let (input, tail) = opt(pair(
        delimited(multispace0, cmp_op, multispace0),
        operand,
    ))(input)?;
    Ok((
        input,
        match tail {
            Some((op, rhs)) => Expr::Compare {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            },
            None => lhs,
        },
    ))
}

fn cmp_op<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, CmpOp, E> {
    // Two-character operators first; `=` is a synonym of `==`.
    alt((
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Eq, tag("=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))(input)
}

fn operand<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    alt((
        delimited(
            pair(char('('), multispace0),
            expression,
            pair(multispace0, char(')')),
        ),
        map(single_quoted, |s| Expr::Literal(Atom::Str(s))),
        map(double_quoted, |s| Expr::Literal(Atom::Str(s))),
        number_literal,
        field_or_null,
    ))(input)
}

// No escape sequences: the banking configs never use them, and a quote
// character cannot appear inside a fixed-width field value anyway.
fn single_quoted<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    map(
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        |s: &str| s.to_string(),
    )(input)
}

fn double_quoted<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        |s: &str| s.to_string(),
    )(input)
}

fn number_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (remaining, num_str) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;

    match Decimal::from_str(num_str) {
        Ok(d) => Ok((remaining, Expr::Literal(Atom::Num(d)))),
        Err(_) => Err(nom::Err::Error(E::from_error_kind(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn field_or_null<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    map(identifier, |s: &str| {
        if s.eq_ignore_ascii_case("null") {
            Expr::Literal(Atom::Null)
        } else {
            Expr::Field(s.to_string())
        }
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(e: Expr) -> Box<Expr> {
        Box::new(e)
    }

    #[test]
    fn test_simple_equality() {
        let expr = parse("status == 'ACTIVE'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                lhs: boxed(Expr::Field("status".into())),
                op: CmpOp::Eq,
                rhs: boxed(Expr::Literal(Atom::Str("ACTIVE".into()))),
            }
        );
    }

    #[test]
    fn test_single_equals_synonym() {
        assert_eq!(parse("a = 'x'").unwrap(), parse("a == 'x'").unwrap());
    }

    #[test]
    fn test_precedence_or_binds_loosest() {
        // a || b && c  parses as  a || (b && c)
        let expr = parse("a || b && c").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref rhs) if matches!(**rhs, Expr::And(_, _))));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        // (a || b) && c
        let expr = parse("(a || b) && c").unwrap();
        assert!(matches!(expr, Expr::And(ref lhs, _) if matches!(**lhs, Expr::Or(_, _))));
    }

    #[test]
    fn test_left_associativity() {
        // a && b && c  parses as  (a && b) && c
        let expr = parse("a && b && c").unwrap();
        assert!(matches!(expr, Expr::And(ref lhs, _) if matches!(**lhs, Expr::And(_, _))));
    }

    #[test]
    fn test_not_prefix_vs_not_equals() {
        let negated = parse("!closed_flag").unwrap();
        assert!(matches!(negated, Expr::Not(_)));

        let ne = parse("status != 'CLOSED'").unwrap();
        assert!(matches!(ne, Expr::Compare { op: CmpOp::Ne, .. }));
    }

    #[test]
    fn test_relational_operators() {
        for (src, op) in [
            ("balance < 0", CmpOp::Lt),
            ("balance <= 0", CmpOp::Le),
            ("balance > 0", CmpOp::Gt),
            ("balance >= 0", CmpOp::Ge),
        ] {
            let expr = parse(src).unwrap();
            assert!(matches!(expr, Expr::Compare { op: got, .. } if got == op), "{src}");
        }
    }

    #[test]
    fn test_number_literals() {
        let expr = parse("amount >= -12.50").unwrap();
        let Expr::Compare { rhs, .. } = expr else { panic!() };
        assert_eq!(
            *rhs,
            Expr::Literal(Atom::Num(Decimal::from_str("-12.50").unwrap()))
        );
    }

    #[test]
    fn test_null_and_empty_literals() {
        let expr = parse("close_date == null").unwrap();
        let Expr::Compare { rhs, .. } = expr else { panic!() };
        assert_eq!(*rhs, Expr::Literal(Atom::Null));

        let expr = parse("memo == ''").unwrap();
        let Expr::Compare { rhs, .. } = expr else { panic!() };
        assert_eq!(*rhs, Expr::Literal(Atom::Str(String::new())));
    }

    #[test]
    fn test_double_quoted_strings() {
        assert_eq!(parse(r#"a == "x y""#).unwrap(), parse("a == 'x y'").unwrap());
    }

    #[test]
    fn test_whitespace_tolerance() {
        assert_eq!(
            parse("  status=='ACTIVE'&&balance>0  ").unwrap(),
            parse("status == 'ACTIVE' && balance > 0").unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse("&& b").is_err());
        assert!(parse("a == ").is_err());
        assert!(parse("a == 'x' extra").is_err());
        assert!(parse("").is_err());
    }
}
