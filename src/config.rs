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

//! Engine configuration.
//!
//! Every pricing default lives here and is passed explicitly into the calls
//! that need it; the engine keeps no module-level defaults of its own.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Margin applied to newly created lines, in percent.
pub const DEFAULT_MARGIN_PERCENT: f64 = 30.0;

/// VAT rate used for tax-inclusive figures, in percent.
pub const DEFAULT_VAT_RATE_PERCENT: f64 = 20.0;

const DEFAULT_FORMULA_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

/// Tunables shared by pricing, instantiation and the formula cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Margin given to lines created by the engine.
    pub default_margin_percent: f64,
    /// VAT rate for HT -> TTC conversion in summaries.
    pub vat_rate_percent: f64,
    /// Maximum number of distinct formula strings kept parsed.
    pub formula_cache_capacity: NonZeroUsize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_margin_percent: DEFAULT_MARGIN_PERCENT,
            vat_rate_percent: DEFAULT_VAT_RATE_PERCENT,
            formula_cache_capacity: NonZeroUsize::new(DEFAULT_FORMULA_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_margin(mut self, percent: f64) -> Self {
        self.default_margin_percent = percent;
        self
    }

    pub fn with_vat_rate(mut self, percent: f64) -> Self {
        self.vat_rate_percent = percent;
        self
    }

    /// Rejects non-finite rates and a negative VAT rate.
    ///
    /// Negative margins are accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("defaultMarginPercent", self.default_margin_percent),
            ("vatRatePercent", self.vat_rate_percent),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
        }
        if self.vat_rate_percent < 0.0 {
            return Err(ConfigError::Negative {
                field: "vatRatePercent",
                value: self.vat_rate_percent,
            });
        }
        Ok(())
    }
}
