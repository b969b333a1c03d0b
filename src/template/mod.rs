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

//! Template instantiation.
//!
//! A [`BoqTemplate`] is a product-independent description of a BOQ:
//! categories, their subcategories, and the lines of each subcategory, with
//! catalog entries named rather than referenced by id. Instantiating it
//! writes a concrete tree for one product through a [`BoqStore`].
//!
//! Instantiation appends. Running it twice on the same product produces two
//! trees; see [`has_tree`](crate::store::has_tree) for a pre-check.

mod builtin;

use crate::catalog::{CatalogMatch, CatalogRef, PriceList};
use crate::config::EngineConfig;
use crate::ids::{CategoryId, ProductId};
use crate::rollup::CategoryKind;
use crate::store::{BoqStore, NewCategory, NewLine, PartialWriteError, StoreError, WriteCounts};
use serde::{Deserialize, Serialize};

pub use builtin::{
    POOL_TEMPLATE_NAME, POOL_TEMPLATE_SOURCE, builtin_template, builtin_template_sources,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqTemplate {
    pub name: String,
    pub categories: Vec<TemplateCategory>,
}

impl BoqTemplate {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn category_count(&self) -> usize {
        self.categories
            .iter()
            .map(|c| 1 + c.subcategories.len())
            .sum()
    }

    pub fn line_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.subcategories)
            .map(|s| s.lines.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCategory {
    pub name: String,
    #[serde(default)]
    pub kind: CategoryKind,
    #[serde(default)]
    pub subcategories: Vec<TemplateSubcategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSubcategory {
    pub name: String,
    #[serde(default)]
    pub lines: Vec<TemplateLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLine {
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub quantity_formula: Option<String>,
    /// Unit used when the catalog entry cannot be found.
    #[serde(default)]
    pub unit: String,
    /// Exact name of the price-list entry supplying unit and cost.
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Outcome of a completed instantiation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiationReport {
    pub created: WriteCounts,
    /// Catalog names with no price-list match, in first-seen order. Lines
    /// naming them were created with the template unit and a zero cost.
    pub unresolved: Vec<String>,
}

/// Writes `template` as a new tree for `product_id`.
///
/// Top categories and subcategories take their template position as
/// `order`; lines are numbered sequentially within their subcategory and
/// get `config.default_margin_percent`.
pub fn instantiate<S>(
    store: &mut S,
    template: &BoqTemplate,
    product_id: ProductId,
    price_list: &PriceList,
    config: &EngineConfig,
) -> Result<InstantiationReport, PartialWriteError>
where
    S: BoqStore + ?Sized,
{
    let mut report = InstantiationReport::default();

    for (top_idx, top_template) in template.categories.iter().enumerate() {
        let top = store
            .create_category(
                NewCategory::top(product_id, &top_template.name, top_template.kind)
                    .order(to_order(top_idx)),
            )
            .map_err(|source| abort(&template.name, report.created, source))?;
        report.created.categories += 1;

        for (sub_idx, sub_template) in top_template.subcategories.iter().enumerate() {
            let sub = store
                .create_category(NewCategory::sub(&top, &sub_template.name).order(to_order(sub_idx)))
                .map_err(|source| abort(&template.name, report.created, source))?;
            report.created.categories += 1;

            for (line_idx, line_template) in sub_template.lines.iter().enumerate() {
                let new_line =
                    template_line(line_template, sub.id, price_list, config, &mut report)
                        .order(to_order(line_idx));
                store
                    .create_line(new_line)
                    .map_err(|source| abort(&template.name, report.created, source))?;
                report.created.lines += 1;
            }
        }
    }

    log::info!(
        "instantiated template '{}' for product {product_id}: {}",
        template.name,
        report.created
    );
    Ok(report)
}

/// Builds the line draft, resolving the catalog entry by name.
fn template_line(
    line: &TemplateLine,
    category_id: CategoryId,
    price_list: &PriceList,
    config: &EngineConfig,
    report: &mut InstantiationReport,
) -> NewLine {
    let mut draft = NewLine::new(category_id, &line.description, config)
        .quantity(line.quantity)
        .unit(&line.unit);
    if let Some(formula) = &line.quantity_formula {
        draft = draft.quantity_formula(formula);
    }

    let Some(name) = &line.catalog else {
        return draft;
    };
    match price_list.resolve(&CatalogRef::Name(name.clone())) {
        CatalogMatch::Resolved(item) => draft.catalog(item),
        CatalogMatch::Unresolved(_) => {
            log::warn!(
                "no price-list entry named '{name}' for line '{}'; using unit '{}' at zero cost",
                line.description,
                line.unit
            );
            if !report.unresolved.contains(name) {
                report.unresolved.push(name.clone());
            }
            draft
        }
    }
}

fn abort(template: &str, completed: WriteCounts, source: StoreError) -> PartialWriteError {
    log::warn!("instantiation of template '{template}' aborted after {completed}: {source}");
    PartialWriteError { completed, source }
}

pub(crate) fn to_order(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
