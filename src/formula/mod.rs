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

//! Parsed formulas and fail-soft evaluation.
//!
//! A formula is parsed once into an immutable [`Expr`] tree and evaluated
//! against an [`EvaluationContext`]. Two policies coexist:
//! - [`evaluate`] never fails: syntax errors and unknown identifiers yield `0`,
//!   which keeps live previews responsive while a formula is being typed.
//! - [`try_evaluate`] / [`Formula::parse`] surface [`FormulaError`] for
//!   editors that want to show a diagnostic next to the input.
//!
//! Division by zero is left to IEEE semantics (`inf`/`NaN`).

mod cache;
mod eval;

use crate::ast::Expr;
use crate::context::EvaluationContext;
use crate::diagnostics::FormulaError;
use crate::parser::parse_formula;
use std::collections::BTreeSet;
use std::sync::Arc;

pub use cache::{CacheStats, FormulaCache};

/// An immutable, cheaply clonable parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: Arc<str>,
    expr: Arc<Expr>,
}

impl Formula {
    /// Parses a formula string.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let expr = parse_formula(source)?;
        Ok(Self {
            source: Arc::from(source),
            expr: Arc::new(expr),
        })
    }

    /// Returns the original formula text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluates against `context`; unknown identifiers read as `0`.
    pub fn eval(&self, context: &EvaluationContext) -> f64 {
        eval::eval_expr(&self.expr, context)
    }

    /// Returns every identifier the formula references, sorted.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        eval::collect_identifiers(&self.expr, &mut names);
        names
    }
}

/// Evaluates `formula` against `context`, falling back to `0` on syntax errors.
pub fn evaluate(formula: &str, context: &EvaluationContext) -> f64 {
    match Formula::parse(formula) {
        Ok(parsed) => parsed.eval(context),
        Err(err) => {
            log::debug!("formula '{formula}' evaluates to 0: {}", err.message);
            0.0
        }
    }
}

/// Evaluates `formula` against `context`, reporting syntax errors.
///
/// Unknown identifiers still read as `0`; only malformed input is an error.
pub fn try_evaluate(formula: &str, context: &EvaluationContext) -> Result<f64, FormulaError> {
    Ok(Formula::parse(formula)?.eval(context))
}

/// Returns the formula text when it is set, i.e. present and not blank.
pub(crate) fn non_blank(formula: Option<&str>) -> Option<&str> {
    formula.filter(|f| !f.trim().is_empty())
}
