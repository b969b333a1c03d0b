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

//! Whole-tree copy and removal between products.

use crate::ids::{CategoryId, ProductId};
use crate::rollup::BoqCategory;
use crate::store::{BoqStore, NewCategory, NewLine, PartialWriteError, StoreError, WriteCounts};
use std::collections::HashMap;

/// Deep-copies every category and line of `source` into `dest`.
///
/// Top-level categories are created first so subcategory parents can be
/// remapped to the new ids; lines follow, copied verbatim (formulas, catalog
/// references, margins, order). Nothing on `dest` is deduplicated.
pub fn clone_tree<S>(
    store: &mut S,
    source: ProductId,
    dest: ProductId,
) -> Result<WriteCounts, PartialWriteError>
where
    S: BoqStore + ?Sized,
{
    let mut counts = WriteCounts::default();
    let categories = store
        .list_categories(source)
        .map_err(|err| abort("clone", counts, err))?;
    let (tops, subs): (Vec<&BoqCategory>, Vec<&BoqCategory>) =
        categories.iter().partition(|c| c.is_top_level());

    // old id -> new id
    let mut remap: HashMap<CategoryId, CategoryId> = HashMap::with_capacity(categories.len());

    for category in tops {
        let created = store
            .create_category(NewCategory {
                product_id: dest,
                parent_id: None,
                name: category.name.clone(),
                kind: category.kind,
                order: category.order,
            })
            .map_err(|err| abort("clone", counts, err))?;
        remap.insert(category.id, created.id);
        counts.categories += 1;
    }

    for category in subs {
        let Some(parent) = category.parent_id.and_then(|p| remap.get(&p).copied()) else {
            log::warn!(
                "skipping subcategory '{}' ({}): parent not found among top-level categories",
                category.name,
                category.id
            );
            continue;
        };
        let created = store
            .create_category(NewCategory {
                product_id: dest,
                parent_id: Some(parent),
                name: category.name.clone(),
                kind: category.kind,
                order: category.order,
            })
            .map_err(|err| abort("clone", counts, err))?;
        remap.insert(category.id, created.id);
        counts.categories += 1;
    }

    for category in &categories {
        let Some(&new_id) = remap.get(&category.id) else {
            continue;
        };
        let lines = store
            .list_lines(category.id)
            .map_err(|err| abort("clone", counts, err))?;
        for line in &lines {
            store
                .create_line(NewLine::copy_of(line, new_id))
                .map_err(|err| abort("clone", counts, err))?;
            counts.lines += 1;
        }
    }

    log::info!("cloned BOQ of product {source} into {dest}: {counts}");
    Ok(counts)
}

/// Deletes every line and category of `product`.
///
/// Lines go first, then subcategories, then top-level categories, so a
/// backend enforcing referential integrity accepts each step.
pub fn clear_product<S>(store: &mut S, product: ProductId) -> Result<WriteCounts, PartialWriteError>
where
    S: BoqStore + ?Sized,
{
    let mut counts = WriteCounts::default();
    let categories = store
        .list_categories(product)
        .map_err(|err| abort("clear", counts, err))?;

    for category in &categories {
        let lines = store
            .list_lines(category.id)
            .map_err(|err| abort("clear", counts, err))?;
        for line in lines {
            store
                .delete_line(line.id)
                .map_err(|err| abort("clear", counts, err))?;
            counts.lines += 1;
        }
    }

    let (tops, subs): (Vec<&BoqCategory>, Vec<&BoqCategory>) =
        categories.iter().partition(|c| c.is_top_level());
    for category in subs.into_iter().chain(tops) {
        store
            .delete_category(category.id)
            .map_err(|err| abort("clear", counts, err))?;
        counts.categories += 1;
    }

    log::info!("cleared BOQ of product {product}: {counts}");
    Ok(counts)
}

fn abort(operation: &str, completed: WriteCounts, source: StoreError) -> PartialWriteError {
    log::warn!("{operation} aborted after {completed}: {source}");
    PartialWriteError { completed, source }
}
