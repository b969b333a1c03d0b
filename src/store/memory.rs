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

//! In-process [`BoqStore`].

use super::{BoqStore, NewCategory, NewLine, StoreError};
use crate::ids::{CategoryId, LineId, ProductId};
use crate::pricing::BoqLine;
use crate::rollup::BoqCategory;
use std::collections::BTreeMap;

/// Map-backed store with random ids.
///
/// Enforces the same referential rules a relational backend would: parents
/// and categories must exist, and a category can only be deleted once it has
/// no lines and no subcategories. [`MemoryStore::fail_after`] injects a
/// backend failure after a number of further successful writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    categories: BTreeMap<CategoryId, BoqCategory>,
    lines: BTreeMap<LineId, BoqLine>,
    writes: usize,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `more_writes` further writes succeed, then fails every write.
    pub fn fail_after(&mut self, more_writes: usize) {
        self.fail_after = Some(self.writes + more_writes);
    }

    /// Removes any injected failure.
    pub fn heal(&mut self) {
        self.fail_after = None;
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn category(&self, id: CategoryId) -> Option<&BoqCategory> {
        self.categories.get(&id)
    }

    pub fn line(&self, id: LineId) -> Option<&BoqLine> {
        self.lines.get(&id)
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        match self.fail_after {
            Some(limit) if self.writes >= limit => Err(StoreError::Backend(format!(
                "injected failure after {limit} writes"
            ))),
            _ => Ok(()),
        }
    }

    fn check_parent(&self, new_parent: Option<CategoryId>) -> Result<(), StoreError> {
        match new_parent {
            Some(parent) if !self.categories.contains_key(&parent) => Err(StoreError::NotFound {
                entity: "category",
                id: parent.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_category(&self, id: CategoryId) -> Result<(), StoreError> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "category",
                id: id.to_string(),
            })
        }
    }
}

impl BoqStore for MemoryStore {
    fn create_category(&mut self, new: NewCategory) -> Result<BoqCategory, StoreError> {
        self.begin_write()?;
        self.check_parent(new.parent_id)?;
        let category = BoqCategory {
            id: CategoryId::new(),
            product_id: new.product_id,
            parent_id: new.parent_id,
            name: new.name,
            kind: new.kind,
            order: new.order,
        };
        self.categories.insert(category.id, category.clone());
        self.writes += 1;
        Ok(category)
    }

    fn update_category(&mut self, category: &BoqCategory) -> Result<(), StoreError> {
        self.begin_write()?;
        self.check_category(category.id)?;
        self.check_parent(category.parent_id)?;
        if category.parent_id == Some(category.id) {
            return Err(StoreError::Rejected(format!(
                "category {} cannot be its own parent",
                category.id
            )));
        }
        self.categories.insert(category.id, category.clone());
        self.writes += 1;
        Ok(())
    }

    fn delete_category(&mut self, id: CategoryId) -> Result<(), StoreError> {
        self.begin_write()?;
        self.check_category(id)?;
        if self.categories.values().any(|c| c.parent_id == Some(id)) {
            return Err(StoreError::Rejected(format!(
                "category {id} still has subcategories"
            )));
        }
        if self.lines.values().any(|l| l.category_id == id) {
            return Err(StoreError::Rejected(format!("category {id} still has lines")));
        }
        self.categories.remove(&id);
        self.writes += 1;
        Ok(())
    }

    fn create_line(&mut self, new: NewLine) -> Result<BoqLine, StoreError> {
        self.begin_write()?;
        self.check_category(new.category_id)?;
        let line = new.into_line(LineId::new());
        self.lines.insert(line.id, line.clone());
        self.writes += 1;
        Ok(line)
    }

    fn update_line(&mut self, line: &BoqLine) -> Result<(), StoreError> {
        self.begin_write()?;
        if !self.lines.contains_key(&line.id) {
            return Err(StoreError::NotFound {
                entity: "line",
                id: line.id.to_string(),
            });
        }
        self.check_category(line.category_id)?;
        self.lines.insert(line.id, line.clone());
        self.writes += 1;
        Ok(())
    }

    fn delete_line(&mut self, id: LineId) -> Result<(), StoreError> {
        self.begin_write()?;
        if self.lines.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "line",
                id: id.to_string(),
            });
        }
        self.writes += 1;
        Ok(())
    }

    fn list_categories(&self, product: ProductId) -> Result<Vec<BoqCategory>, StoreError> {
        let mut categories: Vec<BoqCategory> = self
            .categories
            .values()
            .filter(|c| c.product_id == product)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    fn list_lines(&self, category: CategoryId) -> Result<Vec<BoqLine>, StoreError> {
        let mut lines: Vec<BoqLine> = self
            .lines
            .values()
            .filter(|l| l.category_id == category)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.order);
        Ok(lines)
    }
}
