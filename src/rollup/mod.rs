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

//! Category and portfolio rollups.
//!
//! A category's combined totals are its own lines plus its subcategories'
//! combined totals. Lines are only added to leaf categories, so a top
//! category that owns subcategories normally has no own lines and nothing
//! is counted twice.

mod summary;
mod tree;

use crate::pricing::LinePricing;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

pub use summary::{CategorySummary, PortfolioTotals, PricedLine, ProductSummary, price_tree};
pub use tree::{BoqCategory, CategoryKind, CategoryTree, SubCategory, TopCategory, TreeError};

/// Cost, sale and profit amounts, all excluding tax.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub cost_ht: f64,
    pub sale_ht: f64,
    pub profit_ht: f64,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        cost_ht: 0.0,
        sale_ht: 0.0,
        profit_ht: 0.0,
    };

    /// Totals from cost and sale; profit is derived.
    pub fn new(cost_ht: f64, sale_ht: f64) -> Self {
        Self {
            cost_ht,
            sale_ht,
            profit_ht: sale_ht - cost_ht,
        }
    }

    pub fn of_line(pricing: &LinePricing) -> Self {
        Self::new(pricing.total_cost_ht, pricing.sale_price_ht)
    }

    /// Tax-inclusive sale price at `vat_rate` percent.
    pub fn sale_ttc(&self, vat_rate: f64) -> f64 {
        to_inclusive(self.sale_ht, vat_rate)
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals::new(self.cost_ht + rhs.cost_ht, self.sale_ht + rhs.sale_ht)
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Totals> for Totals {
    fn sum<I: Iterator<Item = &'a Totals>>(iter: I) -> Totals {
        iter.copied().sum()
    }
}

/// Combines a category's own line figures with its subcategories' totals.
pub fn rollup(own_lines: &[LinePricing], subcategories: &[Totals]) -> Totals {
    let own: Totals = own_lines.iter().map(Totals::of_line).sum();
    own + subcategories.iter().sum::<Totals>()
}

/// Converts an HT amount to TTC: `price_ht * (1 + vat_rate / 100)`.
pub fn to_inclusive(price_ht: f64, vat_rate: f64) -> f64 {
    price_ht * (1.0 + vat_rate / 100.0)
}
