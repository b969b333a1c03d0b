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

//! Per-line quantity, unit cost and derived HT figures.

use crate::catalog::PriceList;
use crate::context::EvaluationContext;
use crate::formula::{FormulaCache, evaluate, non_blank};
use crate::ids::{CategoryId, LineId, PriceListItemId};
use serde::{Deserialize, Serialize};

/// One priced row of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqLine {
    pub id: LineId,
    pub category_id: CategoryId,
    pub description: String,
    /// Literal quantity, used when `quantity_formula` is not set.
    pub quantity: f64,
    #[serde(default)]
    pub quantity_formula: Option<String>,
    pub unit: String,
    /// Literal unit cost, the last fallback of cost resolution.
    pub unit_cost: f64,
    #[serde(default)]
    pub unit_cost_formula: Option<String>,
    /// Live reference into the price list.
    #[serde(default)]
    pub price_list_id: Option<PriceListItemId>,
    pub margin_percent: f64,
    pub order: i32,
}

/// Where the effective quantity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuantitySource {
    Formula,
    Literal,
}

/// Where the effective unit cost came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostSource {
    Formula,
    Catalog(PriceListItemId),
    /// The line references a catalog entry that no longer exists; the literal
    /// unit cost was used instead.
    DanglingCatalog(PriceListItemId),
    Literal,
}

/// Computed figures for one line. All amounts exclude tax.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePricing {
    pub effective_quantity: f64,
    pub effective_unit_cost: f64,
    pub total_cost_ht: f64,
    pub sale_price_ht: f64,
    pub profit_ht: f64,
    pub quantity_source: QuantitySource,
    pub cost_source: CostSource,
}

impl LinePricing {
    /// Derives cost, sale and profit from resolved quantity and unit cost.
    pub fn from_parts(
        effective_quantity: f64,
        effective_unit_cost: f64,
        margin_percent: f64,
        quantity_source: QuantitySource,
        cost_source: CostSource,
    ) -> Self {
        let total_cost_ht = effective_quantity * effective_unit_cost;
        let sale_price_ht = total_cost_ht * (1.0 + margin_percent / 100.0);
        Self {
            effective_quantity,
            effective_unit_cost,
            total_cost_ht,
            sale_price_ht,
            profit_ht: sale_price_ht - total_cost_ht,
            quantity_source,
            cost_source,
        }
    }
}

/// Prices `line` against `context` and `price_list`.
///
/// Quantity: formula if set, else literal. Unit cost: formula if set, else
/// the referenced catalog price, else literal.
pub fn price_line(
    line: &BoqLine,
    context: &EvaluationContext,
    price_list: &PriceList,
) -> LinePricing {
    price_line_with(line, context, price_list, evaluate)
}

/// Same as [`price_line`], parsing formulas through `cache`.
pub fn price_line_cached(
    line: &BoqLine,
    context: &EvaluationContext,
    price_list: &PriceList,
    cache: &FormulaCache,
) -> LinePricing {
    price_line_with(line, context, price_list, |formula, context| {
        cache.evaluate(formula, context)
    })
}

fn price_line_with(
    line: &BoqLine,
    context: &EvaluationContext,
    price_list: &PriceList,
    mut eval: impl FnMut(&str, &EvaluationContext) -> f64,
) -> LinePricing {
    let (quantity, quantity_source) = match non_blank(line.quantity_formula.as_deref()) {
        Some(formula) => (eval(formula, context), QuantitySource::Formula),
        None => (line.quantity, QuantitySource::Literal),
    };

    let (unit_cost, cost_source) = match non_blank(line.unit_cost_formula.as_deref()) {
        Some(formula) => (eval(formula, context), CostSource::Formula),
        None => match line.price_list_id {
            Some(id) => match price_list.get(id) {
                Some(item) => (item.unit_price, CostSource::Catalog(id)),
                None => {
                    log::debug!("line {} references missing price-list item {id}", line.id);
                    (line.unit_cost, CostSource::DanglingCatalog(id))
                }
            },
            None => (line.unit_cost, CostSource::Literal),
        },
    };

    LinePricing::from_parts(
        quantity,
        unit_cost,
        line.margin_percent,
        quantity_source,
        cost_source,
    )
}
