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

//! Storage boundary for categories and lines.
//!
//! The engine never owns persistence. Embedders implement [`BoqStore`] over
//! their own backend; [`MemoryStore`] keeps everything in process.
//!
//! Multi-step writes (template instantiation, cloning, clearing) go through
//! this trait one row at a time. They are not transactional: the first
//! failing write stops the operation, rows already written stay, and the
//! caller gets a [`PartialWriteError`] with accurate counts.

mod memory;

use crate::catalog::PriceListItem;
use crate::config::EngineConfig;
use crate::ids::{CategoryId, LineId, PriceListItemId, ProductId};
use crate::pricing::BoqLine;
use crate::rollup::{BoqCategory, CategoryKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Rows written (or deleted) by a multi-step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteCounts {
    pub categories: usize,
    pub lines: usize,
}

impl fmt::Display for WriteCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} categories, {} lines", self.categories, self.lines)
    }
}

/// A multi-step write stopped at its first failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("stopped after {completed}: {source}")]
pub struct PartialWriteError {
    /// Work finished before the failure; it is not rolled back.
    pub completed: WriteCounts,
    #[source]
    pub source: StoreError,
}

/// Category fields supplied on creation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub product_id: ProductId,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub kind: CategoryKind,
    pub order: i32,
}

impl NewCategory {
    pub fn top(product_id: ProductId, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            product_id,
            parent_id: None,
            name: name.into(),
            kind,
            order: 0,
        }
    }

    /// Subcategory of `parent`, inheriting its product and kind.
    pub fn sub(parent: &BoqCategory, name: impl Into<String>) -> Self {
        Self {
            product_id: parent.product_id,
            parent_id: Some(parent.id),
            name: name.into(),
            kind: parent.kind,
            order: 0,
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Line fields supplied on creation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLine {
    pub category_id: CategoryId,
    pub description: String,
    pub quantity: f64,
    pub quantity_formula: Option<String>,
    pub unit: String,
    pub unit_cost: f64,
    pub unit_cost_formula: Option<String>,
    pub price_list_id: Option<PriceListItemId>,
    pub margin_percent: f64,
    pub order: i32,
}

impl NewLine {
    /// Empty line with the configured default margin.
    pub fn new(
        category_id: CategoryId,
        description: impl Into<String>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            category_id,
            description: description.into(),
            quantity: 0.0,
            quantity_formula: None,
            unit: String::new(),
            unit_cost: 0.0,
            unit_cost_formula: None,
            price_list_id: None,
            margin_percent: config.default_margin_percent,
            order: 0,
        }
    }

    /// Verbatim copy of `line` placed under `category_id`.
    pub fn copy_of(line: &BoqLine, category_id: CategoryId) -> Self {
        Self {
            category_id,
            description: line.description.clone(),
            quantity: line.quantity,
            quantity_formula: line.quantity_formula.clone(),
            unit: line.unit.clone(),
            unit_cost: line.unit_cost,
            unit_cost_formula: line.unit_cost_formula.clone(),
            price_list_id: line.price_list_id,
            margin_percent: line.margin_percent,
            order: line.order,
        }
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn quantity_formula(mut self, formula: impl Into<String>) -> Self {
        self.quantity_formula = Some(formula.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn unit_cost_formula(mut self, formula: impl Into<String>) -> Self {
        self.unit_cost_formula = Some(formula.into());
        self
    }

    /// Links the line to `item`, copying its unit and current price.
    pub fn catalog(mut self, item: &PriceListItem) -> Self {
        self.unit = item.unit.clone();
        self.unit_cost = item.unit_price;
        self.price_list_id = Some(item.id);
        self
    }

    pub fn margin(mut self, percent: f64) -> Self {
        self.margin_percent = percent;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn into_line(self, id: LineId) -> BoqLine {
        BoqLine {
            id,
            category_id: self.category_id,
            description: self.description,
            quantity: self.quantity,
            quantity_formula: self.quantity_formula,
            unit: self.unit,
            unit_cost: self.unit_cost,
            unit_cost_formula: self.unit_cost_formula,
            price_list_id: self.price_list_id,
            margin_percent: self.margin_percent,
            order: self.order,
        }
    }
}

/// Create/read/update/delete access to a product's BOQ rows.
pub trait BoqStore {
    fn create_category(&mut self, new: NewCategory) -> Result<BoqCategory, StoreError>;

    fn update_category(&mut self, category: &BoqCategory) -> Result<(), StoreError>;

    fn delete_category(&mut self, id: CategoryId) -> Result<(), StoreError>;

    fn create_line(&mut self, new: NewLine) -> Result<BoqLine, StoreError>;

    fn update_line(&mut self, line: &BoqLine) -> Result<(), StoreError>;

    fn delete_line(&mut self, id: LineId) -> Result<(), StoreError>;

    /// Every category of `product`, top-level and subcategories alike.
    fn list_categories(&self, product: ProductId) -> Result<Vec<BoqCategory>, StoreError>;

    fn list_lines(&self, category: CategoryId) -> Result<Vec<BoqLine>, StoreError>;

    /// Every line of every category of `product`.
    fn list_product_lines(&self, product: ProductId) -> Result<Vec<BoqLine>, StoreError> {
        let mut lines = Vec::new();
        for category in self.list_categories(product)? {
            lines.extend(self.list_lines(category.id)?);
        }
        Ok(lines)
    }
}

/// Returns whether `product` already has at least one category.
///
/// Instantiation and cloning append unconditionally; callers that want to
/// avoid duplicate trees check this first.
pub fn has_tree(store: &impl BoqStore, product: ProductId) -> Result<bool, StoreError> {
    Ok(!store.list_categories(product)?.is_empty())
}
