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

//! Parse cache keyed by formula text.

use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::Formula;
use crate::context::EvaluationContext;
use crate::diagnostics::FormulaError;

/// Hit/miss counters of a [`FormulaCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of formula strings currently held.
    pub entries: usize,
}

/// Thread-safe LRU cache of parsed formulas.
///
/// Failed parses are cached too, so a malformed formula re-evaluated on every
/// keystroke of an unrelated field is parsed once.
pub struct FormulaCache {
    parsed: Mutex<LruCache<String, Result<Formula, FormulaError>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FormulaCache {
    /// Creates a cache holding at most `capacity` formula strings.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            parsed: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the parse result for `source`, parsing on first use.
    pub fn parse(&self, source: &str) -> Result<Formula, FormulaError> {
        let mut parsed = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = parsed.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("formula cache miss for '{source}'");
        let result = Formula::parse(source);
        parsed.put(source.to_string(), result.clone());
        result
    }

    /// Fail-soft evaluation through the cache; same semantics as [`super::evaluate`].
    pub fn evaluate(&self, source: &str, context: &EvaluationContext) -> f64 {
        match self.parse(source) {
            Ok(formula) => formula.eval(context),
            Err(err) => {
                log::debug!("formula '{source}' evaluates to 0: {}", err.message);
                0.0
            }
        }
    }

    /// Current counters and number of cached formula strings.
    pub fn stats(&self) -> CacheStats {
        let entries = self
            .parsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Drops every cached entry and resets the counters.
    pub fn clear(&self) {
        self.parsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for FormulaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaCache")
            .field("stats", &self.stats())
            .finish()
    }
}
