/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Expression parser.

use crate::ast::{BinOp, Expr, ExprKind, Func, SourceSpan, Span};
use nom::Parser;
use nom::{
    branch::alt,
    combinator::{cut, map_res, opt},
    error::{VerboseError, VerboseErrorKind, context},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::delimited,
};

use super::PResult;
use super::utils::{identifier, ws, ws0, ws_char};

/// Deepest allowed nesting of parentheses, signs and calls.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Context label of the nesting-limit failure.
pub(super) const NESTED_TOO_DEEPLY: &str = "formula nested too deeply";

/// Top-level expression parser.
pub(super) fn expr(input: Span<'_>) -> PResult<'_, Expr> {
    parse_add_sub(input, 0)
}

/// Parses left-associative `+`/`-`.
fn parse_add_sub(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_mul_div(input, depth)?;
    loop {
        let (next, op) = opt(alt((ws_char('+'), ws_char('-')))).parse(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = parse_mul_div(next, depth)?;
        let op = if op_char == '+' {
            BinOp::Add
        } else {
            BinOp::Sub
        };
        left = binary(op, left, right);
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `*`/`/`.
fn parse_mul_div(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_unary(input, depth)?;
    loop {
        let (next, op) = opt(alt((ws_char('*'), ws_char('/')))).parse(input)?;
        let Some(op_char) = op else {
            break;
        };

        let (next, right) = parse_unary(next, depth)?;
        let op = if op_char == '*' {
            BinOp::Mul
        } else {
            BinOp::Div
        };
        left = binary(op, left, right);
        input = next;
    }
    Ok((input, left))
}

/// Binds `depth` so a depth-aware parser can be used as a combinator.
fn at_depth<'a>(
    parser: fn(Span<'a>, usize) -> PResult<'a, Expr>,
    depth: usize,
) -> impl FnMut(Span<'a>) -> PResult<'a, Expr> {
    move |input| parser(input, depth)
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}

/// Parses unary sign operators.
///
/// Every nesting construct passes through here, so this is where the depth
/// limit is enforced.
fn parse_unary(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    if depth > MAX_NESTING_DEPTH {
        return failure_at(input, NESTED_TOO_DEEPLY);
    }
    let start = input;
    // Recursive so chains like `--x` work.
    if let Ok((input, _)) = ws_char('-').parse(input) {
        let (input, inner) = parse_unary(input, depth + 1)?;
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::UnaryNeg(Box::new(inner)),
                span,
            },
        ));
    }
    if let Ok((input, _)) = ws_char('+').parse(input) {
        return parse_unary(input, depth + 1);
    }
    parse_primary(input, depth)
}

/// Parses expression atoms.
fn parse_primary(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    context(
        "expression",
        alt((
            at_depth(parse_parenthesized, depth),
            parse_number,
            at_depth(parse_ident_or_call, depth),
        )),
    )
    .parse(input)
}

/// Parses parenthesized expressions.
fn parse_parenthesized(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let start = input;
    let (input, mut inner) = delimited(
        ws_char('('),
        at_depth(parse_add_sub, depth + 1),
        cut(context("')'", ws_char(')'))),
    )
    .parse(input)?;
    inner.span = SourceSpan::from_bounds(start, input);
    Ok((input, inner))
}

/// Parses numeric literal expressions.
fn parse_number(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, n) = ws(map_res(recognize_float, |s: Span<'_>| {
        s.fragment().parse::<f64>()
    }))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Number(n),
            span,
        },
    ))
}

/// Parses either an identifier or a builtin call.
///
/// Once `name(` has been seen the parser commits: unknown functions and
/// wrong arity are hard failures rather than backtracking points.
fn parse_ident_or_call(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, name) = identifier(input)?;
    let name_end = input;
    let (input, _) = ws0(input)?;

    let (input, open) = opt(ws_char('(')).parse(input)?;
    if open.is_none() {
        let span = SourceSpan::from_bounds(start, name_end);
        return Ok((
            input,
            Expr {
                kind: ExprKind::Ident(name),
                span,
            },
        ));
    }

    let Some(func) = Func::from_name(&name) else {
        return failure_at(start, "a known function (CEIL, FLOOR, ROUND)");
    };
    let (input, args) =
        separated_list0(ws_char(','), at_depth(parse_add_sub, depth + 1)).parse(input)?;
    let (input, _) = cut(context("')'", ws_char(')'))).parse(input)?;
    let Ok([arg]) = <[Expr; 1]>::try_from(args) else {
        return failure_at(start, "exactly one function argument");
    };

    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Call {
                func,
                arg: Box::new(arg),
            },
            span,
        },
    ))
}

fn failure_at<'a, O>(at: Span<'a>, expected: &'static str) -> PResult<'a, O> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(at, VerboseErrorKind::Context(expected))],
    }))
}
