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

//! Priced views of a category tree and portfolio totals.

use super::tree::{CategoryKind, CategoryTree, SubCategory, TopCategory};
use super::{Totals, rollup, to_inclusive};
use crate::catalog::PriceList;
use crate::context::EvaluationContext;
use crate::ids::{CategoryId, LineId, ProductId};
use crate::pricing::{BoqLine, LinePricing, price_line};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub line_id: LineId,
    pub description: String,
    pub unit: String,
    pub pricing: LinePricing,
}

/// Priced category with its own and combined totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub kind: CategoryKind,
    /// Totals of this category's own lines.
    pub own: Totals,
    /// Own lines plus subcategories.
    pub combined: Totals,
    pub lines: Vec<PricedLine>,
    pub subcategories: Vec<CategorySummary>,
}

/// Base-price and options totals of a product.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub base: Totals,
    pub options: Totals,
}

impl PortfolioTotals {
    pub fn add(&mut self, kind: CategoryKind, totals: Totals) {
        match kind {
            CategoryKind::Base => self.base = self.base + totals,
            CategoryKind::Option => self.options = self.options + totals,
        }
    }

    /// Accumulates own-line totals of `summary` and all its subcategories,
    /// each under its own kind.
    fn add_category(&mut self, summary: &CategorySummary) {
        self.add(summary.kind, summary.own);
        for sub in &summary.subcategories {
            self.add_category(sub);
        }
    }
}

/// Fully priced BOQ of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub categories: Vec<CategorySummary>,
    pub portfolio: PortfolioTotals,
    pub vat_rate_percent: f64,
}

impl ProductSummary {
    pub fn base_ttc(&self) -> f64 {
        to_inclusive(self.portfolio.base.sale_ht, self.vat_rate_percent)
    }

    pub fn options_ttc(&self) -> f64 {
        to_inclusive(self.portfolio.options.sale_ht, self.vat_rate_percent)
    }

    /// Base and options together.
    pub fn total_ht(&self) -> Totals {
        self.portfolio.base + self.portfolio.options
    }
}

fn price_lines(
    lines: &[BoqLine],
    pricer: &mut impl FnMut(&BoqLine) -> LinePricing,
) -> (Vec<PricedLine>, Totals) {
    let priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| PricedLine {
            line_id: line.id,
            description: line.description.clone(),
            unit: line.unit.clone(),
            pricing: pricer(line),
        })
        .collect();
    let own = priced.iter().map(|p| Totals::of_line(&p.pricing)).sum();
    (priced, own)
}

impl SubCategory {
    pub fn price(&self, pricer: &mut impl FnMut(&BoqLine) -> LinePricing) -> CategorySummary {
        let (lines, own) = price_lines(&self.lines, pricer);
        CategorySummary {
            id: self.category.id,
            name: self.category.name.clone(),
            kind: self.category.kind,
            own,
            combined: own,
            lines,
            subcategories: Vec::new(),
        }
    }
}

impl TopCategory {
    pub fn price(&self, pricer: &mut impl FnMut(&BoqLine) -> LinePricing) -> CategorySummary {
        let (lines, own) = price_lines(&self.lines, pricer);
        let subcategories: Vec<CategorySummary> = self
            .subcategories
            .iter()
            .map(|sub| sub.price(pricer))
            .collect();
        let own_pricings: Vec<LinePricing> = lines.iter().map(|l| l.pricing).collect();
        let sub_totals: Vec<Totals> = subcategories.iter().map(|s| s.combined).collect();
        let combined = rollup(&own_pricings, &sub_totals);
        CategorySummary {
            id: self.category.id,
            name: self.category.name.clone(),
            kind: self.category.kind,
            own,
            combined,
            lines,
            subcategories,
        }
    }
}

impl CategoryTree {
    /// Prices every line with `pricer` and rolls the tree up.
    pub fn price(
        &self,
        mut pricer: impl FnMut(&BoqLine) -> LinePricing,
        vat_rate_percent: f64,
    ) -> ProductSummary {
        let categories: Vec<CategorySummary> =
            self.top.iter().map(|top| top.price(&mut pricer)).collect();
        let mut portfolio = PortfolioTotals::default();
        for category in &categories {
            portfolio.add_category(category);
        }
        ProductSummary {
            product_id: self.product_id,
            categories,
            portfolio,
            vat_rate_percent,
        }
    }
}

/// Prices `tree` with [`price_line`] against `context` and `price_list`.
pub fn price_tree(
    tree: &CategoryTree,
    context: &EvaluationContext,
    price_list: &PriceList,
    vat_rate_percent: f64,
) -> ProductSummary {
    tree.price(|line| price_line(line, context, price_list), vat_rate_percent)
}
