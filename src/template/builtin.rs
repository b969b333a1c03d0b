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

//! Templates embedded in the crate.
//!
//! Templates ship as JSON files under `templates/` and are parsed on demand.

use super::BoqTemplate;

/// Canonical name of the embedded swimming-pool template.
pub const POOL_TEMPLATE_NAME: &str = "piscine";

/// Embedded source text for `templates/pool.json`.
pub const POOL_TEMPLATE_SOURCE: &str = include_str!("../../templates/pool.json");

/// Returns every embedded template source as `(name, json)`.
pub fn builtin_template_sources() -> Vec<(&'static str, &'static str)> {
    vec![(POOL_TEMPLATE_NAME, POOL_TEMPLATE_SOURCE)]
}

/// Parses the embedded template called `name`, if there is one.
pub fn builtin_template(name: &str) -> Option<Result<BoqTemplate, serde_json::Error>> {
    builtin_template_sources()
        .into_iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, source)| BoqTemplate::from_json(source))
}
