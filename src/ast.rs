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

//! Formula AST with source spans.
//!
//! The parser produces this tree once per formula string; evaluation walks it
//! against an [`EvaluationContext`](crate::EvaluationContext).

use nom_locate::LocatedSpan;

/// Parser input span type carrying byte offsets and column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span covers no input.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a span that starts at `self` and ends at `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            column: self.column,
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
}

impl BinOp {
    /// Applies the operator with IEEE semantics; `x / 0` is `inf` or `NaN`.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinOp::Add => left + right,
            BinOp::Sub => left - right,
            BinOp::Mul => left * right,
            BinOp::Div => left / right,
        }
    }
}

/// Unary rounding functions callable from formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// `CEIL(x)`: smallest integer not less than `x`.
    Ceil,
    /// `FLOOR(x)`: largest integer not greater than `x`.
    Floor,
    /// `ROUND(x)`: nearest integer, halves away from zero.
    Round,
}

impl Func {
    /// Looks up a function by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("ceil") {
            Some(Func::Ceil)
        } else if name.eq_ignore_ascii_case("floor") {
            Some(Func::Floor)
        } else if name.eq_ignore_ascii_case("round") {
            Some(Func::Round)
        } else {
            None
        }
    }

    /// Canonical upper-case spelling.
    pub fn name(self) -> &'static str {
        match self {
            Func::Ceil => "CEIL",
            Func::Floor => "FLOOR",
            Func::Round => "ROUND",
        }
    }

    /// Applies the function to its single argument.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Func::Ceil => value.ceil(),
            Func::Floor => value.floor(),
            Func::Round => value.round(),
        }
    }
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal.
    Number(f64),
    /// Identifier reference, resolved against the evaluation context.
    Ident(String),
    /// Unary negation.
    UnaryNeg(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator kind.
        op: BinOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Builtin function call.
    Call {
        /// Resolved function.
        func: Func,
        /// Single argument.
        arg: Box<Expr>,
    },
}

/// Spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression payload.
    pub kind: ExprKind,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}
