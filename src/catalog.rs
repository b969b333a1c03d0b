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

//! Price-list catalog and reference resolution.

use crate::ids::PriceListItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Centralized, reusable priced unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceListItem {
    pub id: PriceListItemId,
    pub name: String,
    pub unit: String,
    pub unit_price: f64,
}

impl PriceListItem {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, unit_price: f64) -> Self {
        Self {
            id: PriceListItemId::new(),
            name: name.into(),
            unit: unit.into(),
            unit_price,
        }
    }
}

/// How a caller refers to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRef {
    Id(PriceListItemId),
    /// Exact, case-sensitive name match.
    Name(String),
}

/// Outcome of a catalog lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogMatch<'a> {
    Resolved(&'a PriceListItem),
    Unresolved(CatalogRef),
}

impl<'a> CatalogMatch<'a> {
    pub fn item(&self) -> Option<&'a PriceListItem> {
        match self {
            CatalogMatch::Resolved(item) => Some(item),
            CatalogMatch::Unresolved(_) => None,
        }
    }
}

/// Price-list snapshot indexed by id and by name.
///
/// When two entries share a name, name lookups return the first one.
#[derive(Debug, Clone, Default)]
pub struct PriceList {
    items: Vec<PriceListItem>,
    by_id: HashMap<PriceListItemId, usize>,
    by_name: HashMap<String, usize>,
}

impl PriceList {
    /// Indexes `items` by id and by name.
    pub fn new(items: Vec<PriceListItem>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_name = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            by_id.insert(item.id, idx);
            by_name.entry(item.name.clone()).or_insert(idx);
        }
        Self {
            items,
            by_id,
            by_name,
        }
    }

    /// Entry with `id`, if it is still in the list.
    pub fn get(&self, id: PriceListItemId) -> Option<&PriceListItem> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PriceListItem> {
        self.by_name.get(name).map(|&idx| &self.items[idx])
    }

    pub fn resolve(&self, reference: &CatalogRef) -> CatalogMatch<'_> {
        let found = match reference {
            CatalogRef::Id(id) => self.get(*id),
            CatalogRef::Name(name) => self.find_by_name(name),
        };
        match found {
            Some(item) => CatalogMatch::Resolved(item),
            None => CatalogMatch::Unresolved(reference.clone()),
        }
    }

    pub fn items(&self) -> &[PriceListItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<PriceListItem> for PriceList {
    fn from_iter<T: IntoIterator<Item = PriceListItem>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
