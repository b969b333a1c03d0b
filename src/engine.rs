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

//! Engine facade wiring configuration, the formula cache and storage.

use crate::catalog::PriceList;
use crate::cloner::{clear_product, clone_tree};
use crate::config::{ConfigError, EngineConfig};
use crate::context::{
    DimensionSet, EvaluationContext, ResolvedVariable, VariableDefinition, resolve_context_cached,
    resolve_variables_cached,
};
use crate::formula::{CacheStats, FormulaCache};
use crate::ids::{CategoryId, ProductId};
use crate::pricing::{BoqLine, LinePricing, price_line_cached};
use crate::rollup::{CategoryTree, ProductSummary, TreeError};
use crate::store::{BoqStore, NewLine, PartialWriteError, StoreError, WriteCounts};
use crate::template::{BoqTemplate, InstantiationReport, instantiate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Long-lived pricing engine.
///
/// Holds no BOQ state: every call takes its inputs explicitly. The only
/// shared state is the formula parse cache, which is safe to use from
/// several threads at once.
#[derive(Debug)]
pub struct BoqEngine {
    config: EngineConfig,
    formulas: FormulaCache,
}

impl Default for BoqEngine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl BoqEngine {
    /// Validates `config` and builds an engine around it.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: EngineConfig) -> Self {
        let formulas = FormulaCache::new(config.formula_cache_capacity);
        Self { config, formulas }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.formulas.stats()
    }

    /// Fail-soft formula evaluation through the parse cache.
    pub fn evaluate(&self, formula: &str, context: &EvaluationContext) -> f64 {
        self.formulas.evaluate(formula, context)
    }

    pub fn resolve_context(
        &self,
        dimensions: &DimensionSet,
        variables: &[VariableDefinition],
    ) -> EvaluationContext {
        resolve_context_cached(dimensions, variables, &self.formulas)
    }

    /// Resolved variables with labels, for preview panels.
    pub fn resolve_variables(
        &self,
        dimensions: &DimensionSet,
        variables: &[VariableDefinition],
    ) -> Vec<ResolvedVariable> {
        resolve_variables_cached(dimensions, variables, &self.formulas)
    }

    pub fn price_line(
        &self,
        line: &BoqLine,
        context: &EvaluationContext,
        price_list: &PriceList,
    ) -> LinePricing {
        price_line_cached(line, context, price_list, &self.formulas)
    }

    /// Line draft carrying the configured default margin.
    pub fn new_line(&self, category_id: CategoryId, description: impl Into<String>) -> NewLine {
        NewLine::new(category_id, description, &self.config)
    }

    /// Loads the tree of `product` from `store`.
    pub fn load_tree<S>(&self, store: &S, product: ProductId) -> Result<CategoryTree, EngineError>
    where
        S: BoqStore + ?Sized,
    {
        let categories = store.list_categories(product)?;
        let lines = store.list_product_lines(product)?;
        Ok(CategoryTree::assemble(product, categories, lines)?)
    }

    /// Resolves variables, prices every line of `product` and rolls up.
    pub fn summarize_product<S>(
        &self,
        store: &S,
        product: ProductId,
        dimensions: &DimensionSet,
        variables: &[VariableDefinition],
        price_list: &PriceList,
    ) -> Result<ProductSummary, EngineError>
    where
        S: BoqStore + ?Sized,
    {
        let tree = self.load_tree(store, product)?;
        let context = self.resolve_context(dimensions, variables);
        Ok(tree.price(
            |line| self.price_line(line, &context, price_list),
            self.config.vat_rate_percent,
        ))
    }

    pub fn instantiate<S>(
        &self,
        store: &mut S,
        template: &BoqTemplate,
        product: ProductId,
        price_list: &PriceList,
    ) -> Result<InstantiationReport, PartialWriteError>
    where
        S: BoqStore + ?Sized,
    {
        instantiate(store, template, product, price_list, &self.config)
    }

    pub fn clone_tree<S>(
        &self,
        store: &mut S,
        source: ProductId,
        dest: ProductId,
    ) -> Result<WriteCounts, PartialWriteError>
    where
        S: BoqStore + ?Sized,
    {
        clone_tree(store, source, dest)
    }

    pub fn clear_product<S>(
        &self,
        store: &mut S,
        product: ProductId,
    ) -> Result<WriteCounts, PartialWriteError>
    where
        S: BoqStore + ?Sized,
    {
        clear_product(store, product)
    }
}
