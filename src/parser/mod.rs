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

//! `nom` parser for the formula language.
//!
//! The grammar supports:
//! - decimal literals (`12`, `2.4`, `.5`, `1e3`)
//! - identifiers resolved against the evaluation context
//! - unary `-` and `+`
//! - binary `+ - * /` with the usual precedence, left-associative
//! - parenthesized sub-expressions
//! - one-argument builtins `CEIL`, `FLOOR`, `ROUND` (case-insensitive)

mod expr;
mod utils;

use crate::ast::{Expr, SourceSpan, Span};
use crate::diagnostics::FormulaError;
use nom::{
    IResult,
    combinator::all_consuming,
    error::{ErrorKind, VerboseError, VerboseErrorKind},
    sequence::delimited,
};

use self::expr::{NESTED_TOO_DEEPLY, expr};
use self::utils::ws0;

type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

pub use self::expr::MAX_NESTING_DEPTH;

/// Longest accepted formula, in bytes.
///
/// Operator chains are folded into a left-deep tree, so this bounds the depth
/// of trees that nesting limits alone do not.
pub const MAX_FORMULA_LEN: usize = 4096;

/// Parses one formula string into a spanned expression tree.
pub fn parse_formula(source: &str) -> Result<Expr, FormulaError> {
    if source.len() > MAX_FORMULA_LEN {
        return Err(FormulaError::message_only(format!(
            "Syntax error: formula longer than {MAX_FORMULA_LEN} bytes"
        )));
    }
    let input = Span::new(source);
    // `all_consuming` ensures trailing garbage is treated as syntax error.
    match all_consuming(delimited(ws0, expr, ws0))(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(err) => Err(parse_error_to_formula_error(err, source)),
    }
}

/// Converts a `nom` verbose error to a formula diagnostic.
fn parse_error_to_formula_error(
    err: nom::Err<VerboseError<Span<'_>>>,
    source: &str,
) -> FormulaError {
    match err {
        nom::Err::Incomplete(_) => FormulaError::message_only("Incomplete formula"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // Anchor on the innermost labelled context; raw kinds are a fallback.
            let anchor = e
                .errors
                .iter()
                .find(|(_, kind)| matches!(kind, VerboseErrorKind::Context(_)))
                .or_else(|| e.errors.last());
            if let Some((span, kind)) = anchor {
                let span = SourceSpan::from_bounds(*span, *span);
                let detail = match kind {
                    VerboseErrorKind::Context(ctx) if *ctx == NESTED_TOO_DEEPLY => {
                        format!("Syntax error: {ctx}")
                    }
                    VerboseErrorKind::Context(ctx) => format!("Syntax error: expected {ctx}"),
                    VerboseErrorKind::Char(c) => format!("Syntax error: expected '{c}'"),
                    VerboseErrorKind::Nom(ErrorKind::Eof) => {
                        "Syntax error: unexpected trailing input".to_string()
                    }
                    VerboseErrorKind::Nom(kind) => format!("Syntax error near {kind:?}"),
                };
                FormulaError::from_span(detail, source, &span)
            } else {
                FormulaError::message_only("Syntax error")
            }
        }
    }
}
