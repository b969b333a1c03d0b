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

//! Two-level category tree.
//!
//! Storage hands categories over as flat rows with a nullable parent. The
//! tree types encode the depth bound instead: a [`SubCategory`] has no
//! children, so a third level cannot be represented once assembled.

use crate::ids::{CategoryId, ProductId};
use crate::pricing::BoqLine;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Base price vs. optional extra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Base,
    Option,
}

impl CategoryKind {
    pub fn from_is_option(is_option: bool) -> Self {
        if is_option {
            CategoryKind::Option
        } else {
            CategoryKind::Base
        }
    }

    pub fn is_option(self) -> bool {
        self == CategoryKind::Option
    }
}

/// Flat category row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqCategory {
    pub id: CategoryId,
    pub product_id: ProductId,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub kind: CategoryKind,
    pub order: i32,
}

impl BoqCategory {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("category '{name}' ({id}) points to missing parent {parent}")]
    MissingParent {
        id: CategoryId,
        name: String,
        parent: CategoryId,
    },
    #[error("category '{name}' ({id}) is nested under subcategory {parent}; only two levels are allowed")]
    TooDeep {
        id: CategoryId,
        name: String,
        parent: CategoryId,
    },
    #[error("category '{name}' ({id}) belongs to product {found}, expected {expected}")]
    ForeignCategory {
        id: CategoryId,
        name: String,
        expected: ProductId,
        found: ProductId,
    },
    #[error("line '{description}' references missing category {category}")]
    OrphanLine {
        description: String,
        category: CategoryId,
    },
}

/// Leaf category: owns lines only.
#[derive(Debug, Clone, PartialEq)]
pub struct SubCategory {
    pub category: BoqCategory,
    pub lines: Vec<BoqLine>,
}

/// Top-level category with optional subcategories.
#[derive(Debug, Clone, PartialEq)]
pub struct TopCategory {
    pub category: BoqCategory,
    /// Own lines; empty by convention once subcategories exist.
    pub lines: Vec<BoqLine>,
    pub subcategories: Vec<SubCategory>,
}

/// Whole BOQ of one product, siblings and lines sorted by `order`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTree {
    pub product_id: ProductId,
    pub top: Vec<TopCategory>,
}

impl CategoryTree {
    /// Builds the tree from flat storage rows.
    pub fn assemble(
        product_id: ProductId,
        categories: Vec<BoqCategory>,
        lines: Vec<BoqLine>,
    ) -> Result<Self, TreeError> {
        let mut parents: HashMap<CategoryId, Option<CategoryId>> = HashMap::new();
        for category in &categories {
            if category.product_id != product_id {
                return Err(TreeError::ForeignCategory {
                    id: category.id,
                    name: category.name.clone(),
                    expected: product_id,
                    found: category.product_id,
                });
            }
            parents.insert(category.id, category.parent_id);
        }

        for category in &categories {
            let Some(parent) = category.parent_id else {
                continue;
            };
            match parents.get(&parent) {
                None => {
                    return Err(TreeError::MissingParent {
                        id: category.id,
                        name: category.name.clone(),
                        parent,
                    });
                }
                Some(Some(_)) => {
                    return Err(TreeError::TooDeep {
                        id: category.id,
                        name: category.name.clone(),
                        parent,
                    });
                }
                Some(None) => {}
            }
        }

        let mut lines_by_category: HashMap<CategoryId, Vec<BoqLine>> = HashMap::new();
        for line in lines {
            if !parents.contains_key(&line.category_id) {
                return Err(TreeError::OrphanLine {
                    description: line.description,
                    category: line.category_id,
                });
            }
            lines_by_category
                .entry(line.category_id)
                .or_default()
                .push(line);
        }
        let mut take_lines = |id: CategoryId| {
            let mut lines = lines_by_category.remove(&id).unwrap_or_default();
            lines.sort_by(compare_lines);
            lines
        };

        let (top_rows, sub_rows): (Vec<_>, Vec<_>) =
            categories.into_iter().partition(BoqCategory::is_top_level);

        let mut subs_by_parent: HashMap<CategoryId, Vec<SubCategory>> = HashMap::new();
        for category in sub_rows {
            let lines = take_lines(category.id);
            if let Some(parent) = category.parent_id {
                subs_by_parent
                    .entry(parent)
                    .or_default()
                    .push(SubCategory { category, lines });
            }
        }

        let mut top: Vec<TopCategory> = top_rows
            .into_iter()
            .map(|category| {
                let lines = take_lines(category.id);
                let mut subcategories = subs_by_parent.remove(&category.id).unwrap_or_default();
                subcategories.sort_by(|a, b| compare_categories(&a.category, &b.category));
                TopCategory {
                    category,
                    lines,
                    subcategories,
                }
            })
            .collect();
        top.sort_by(|a, b| compare_categories(&a.category, &b.category));

        Ok(Self { product_id, top })
    }

    pub fn category_count(&self) -> usize {
        self.top.iter().map(|t| 1 + t.subcategories.len()).sum()
    }

    pub fn line_count(&self) -> usize {
        self.top
            .iter()
            .map(|t| t.lines.len() + t.subcategories.iter().map(|s| s.lines.len()).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }
}

fn compare_categories(a: &BoqCategory, b: &BoqCategory) -> Ordering {
    a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name))
}

fn compare_lines(a: &BoqLine, b: &BoqLine) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.description.cmp(&b.description))
}
