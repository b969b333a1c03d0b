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

//! Parametric bill-of-quantities (BOQ) pricing engine.
//!
//! This crate provides:
//! - A small formula language (`+ - * /`, parentheses, identifiers,
//!   `CEIL`/`FLOOR`/`ROUND`) parsed once and evaluated fail-soft.
//! - Derived-variable resolution from product dimensions.
//! - Per-line pricing from literals, formulas or live price-list references.
//! - Two-level category rollups into base and options totals.
//! - Template instantiation and tree cloning through a storage trait.
//!
//! # Pipeline
//!
//! 1. Seed an [`EvaluationContext`] with a [`DimensionSet`].
//! 2. Resolve [`VariableDefinition`]s in declaration order.
//! 3. Price each [`BoqLine`] against the context and the [`PriceList`].
//! 4. Roll lines up through the [`CategoryTree`] into a [`ProductSummary`].
//!
//! # Failure model
//!
//! Evaluation never fails: malformed formulas (including ones nested deeper
//! than [`MAX_NESTING_DEPTH`] or longer than [`MAX_FORMULA_LEN`]) and unknown
//! identifiers read as `0`, and division by zero yields IEEE `inf`/`NaN`. Only storage-facing
//! operations return errors, and multi-step writes report partial progress
//! through [`PartialWriteError`] instead of rolling back.

mod ast;
mod catalog;
mod cloner;
mod config;
mod context;
mod diagnostics;
mod engine;
mod formula;
mod ids;
mod parser;
mod pricing;
mod rollup;
mod store;
mod template;

pub use ast::{BinOp, Expr, ExprKind, Func, SourceSpan};
pub use catalog::{CatalogMatch, CatalogRef, PriceList, PriceListItem};
pub use cloner::{clear_product, clone_tree};
pub use config::{ConfigError, DEFAULT_MARGIN_PERCENT, DEFAULT_VAT_RATE_PERCENT, EngineConfig};
pub use context::{
    DEPTH_VAR, DimensionSet, EvaluationContext, LENGTH_VAR, ResolvedVariable, VariableDefinition,
    VariableIssue, WIDTH_VAR, check_variables, resolve_context, resolve_context_cached,
    resolve_variables, resolve_variables_cached,
};
pub use diagnostics::FormulaError;
pub use engine::{BoqEngine, EngineError};
pub use formula::{CacheStats, Formula, FormulaCache, evaluate, try_evaluate};
pub use ids::{CategoryId, LineId, PriceListItemId, ProductId, VariableId};
pub use parser::{MAX_FORMULA_LEN, MAX_NESTING_DEPTH};
pub use pricing::{BoqLine, CostSource, LinePricing, QuantitySource, price_line, price_line_cached};
pub use rollup::{
    BoqCategory, CategoryKind, CategorySummary, CategoryTree, PortfolioTotals, PricedLine,
    ProductSummary, SubCategory, TopCategory, Totals, TreeError, price_tree, rollup, to_inclusive,
};
pub use store::{
    BoqStore, MemoryStore, NewCategory, NewLine, PartialWriteError, StoreError, WriteCounts,
    has_tree,
};
pub use template::{
    BoqTemplate, InstantiationReport, POOL_TEMPLATE_NAME, POOL_TEMPLATE_SOURCE, TemplateCategory,
    TemplateLine, TemplateSubcategory, builtin_template, builtin_template_sources, instantiate,
};

/// Parses a formula, returning source diagnostics on syntax errors.
pub fn parse_formula(source: &str) -> Result<Formula, FormulaError> {
    Formula::parse(source)
}

#[cfg(test)]
mod tests;
