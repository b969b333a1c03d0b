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

//! Tree-walking evaluation over a flat numeric context.

use crate::ast::{Expr, ExprKind};
use crate::context::EvaluationContext;
use std::collections::BTreeSet;

/// Evaluates an expression tree. Total: never fails, never panics.
pub(super) fn eval_expr(expr: &Expr, context: &EvaluationContext) -> f64 {
    match &expr.kind {
        ExprKind::Number(n) => *n,
        ExprKind::Ident(name) => context.value_of(name),
        ExprKind::UnaryNeg(inner) => -eval_expr(inner, context),
        ExprKind::Binary { op, left, right } => {
            op.apply(eval_expr(left, context), eval_expr(right, context))
        }
        ExprKind::Call { func, arg } => func.apply(eval_expr(arg, context)),
    }
}

/// Collects identifier names referenced by `expr`.
pub(super) fn collect_identifiers(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.kind {
        ExprKind::Number(_) => {}
        ExprKind::Ident(name) => {
            out.insert(name.clone());
        }
        ExprKind::UnaryNeg(inner) => collect_identifiers(inner, out),
        ExprKind::Binary { left, right, .. } => {
            collect_identifiers(left, out);
            collect_identifiers(right, out);
        }
        ExprKind::Call { arg, .. } => collect_identifiers(arg, out),
    }
}
