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

//! Evaluation context and derived-variable resolution.
//!
//! A context is seeded with the three dimensions of the product under fixed
//! names, then extended with one entry per [`VariableDefinition`], evaluated
//! strictly in declaration order. A variable can therefore only see the
//! dimensions and the variables declared before it; there is no dependency
//! sorting.

use crate::diagnostics::FormulaError;
use crate::formula::{Formula, FormulaCache, evaluate};
use crate::ids::VariableId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Context name of [`DimensionSet::length`].
pub const LENGTH_VAR: &str = "longueur";
/// Context name of [`DimensionSet::width`].
pub const WIDTH_VAR: &str = "largeur";
/// Context name of [`DimensionSet::depth`].
pub const DEPTH_VAR: &str = "profondeur";

/// User-entered physical dimensions of a product.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionSet {
    pub length: f64,
    pub width: f64,
    pub depth: f64,
}

impl DimensionSet {
    /// Dimensions in the order length, width, depth.
    pub fn new(length: f64, width: f64, depth: f64) -> Self {
        Self {
            length,
            width,
            depth,
        }
    }

    /// Dimensions paired with their context names.
    pub fn named(&self) -> [(&'static str, f64); 3] {
        [
            (LENGTH_VAR, self.length),
            (WIDTH_VAR, self.width),
            (DEPTH_VAR, self.depth),
        ]
    }
}

/// Admin-managed derived variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub id: VariableId,
    /// Context key other formulas refer to.
    pub name: String,
    pub label: String,
    pub unit: String,
    pub formula: String,
}

impl VariableDefinition {
    /// Variable with a fresh id, labelled with its own name and no unit.
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: VariableId::new(),
            label: name.clone(),
            name,
            unit: String::new(),
            formula: formula.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, unit: impl Into<String>) -> Self {
        self.label = label.into();
        self.unit = unit.into();
        self
    }
}

/// Flat name -> value map consumed by formula evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    values: HashMap<String, f64>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding only the three dimensions.
    pub fn from_dimensions(dimensions: &DimensionSet) -> Self {
        dimensions
            .named()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    /// Value of `name`, or `None` when the name is unknown.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of `name`, or `0` when the name is unknown.
    pub fn value_of(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Sets `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Every `(name, value)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, f64>> for EvaluationContext {
    fn from(values: HashMap<String, f64>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, f64)> for EvaluationContext {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One resolved variable, for preview panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVariable {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub value: f64,
}

/// Builds the evaluation context for `dimensions` and `variables`.
///
/// Pure and total: malformed formulas resolve to `0`.
pub fn resolve_context(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
) -> EvaluationContext {
    resolve_context_with(dimensions, variables, evaluate)
}

/// Same as [`resolve_context`], parsing formulas through `cache`.
pub fn resolve_context_cached(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
    cache: &FormulaCache,
) -> EvaluationContext {
    resolve_context_with(dimensions, variables, |formula, context| {
        cache.evaluate(formula, context)
    })
}

fn resolve_context_with(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
    eval: impl FnMut(&str, &EvaluationContext) -> f64,
) -> EvaluationContext {
    resolve_each(dimensions, variables, eval, |_, _| {})
}

/// Resolves `variables` and returns them in declaration order with labels.
pub fn resolve_variables(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
) -> Vec<ResolvedVariable> {
    resolve_variables_with(dimensions, variables, evaluate)
}

/// Same as [`resolve_variables`], parsing formulas through `cache`.
pub fn resolve_variables_cached(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
    cache: &FormulaCache,
) -> Vec<ResolvedVariable> {
    resolve_variables_with(dimensions, variables, |formula, context| {
        cache.evaluate(formula, context)
    })
}

fn resolve_variables_with(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
    eval: impl FnMut(&str, &EvaluationContext) -> f64,
) -> Vec<ResolvedVariable> {
    let mut resolved = Vec::with_capacity(variables.len());
    resolve_each(dimensions, variables, eval, |variable, value| {
        resolved.push(ResolvedVariable {
            name: variable.name.clone(),
            label: variable.label.clone(),
            unit: variable.unit.clone(),
            value,
        });
    });
    resolved
}

/// Seeds the dimensions, then evaluates each variable in declaration order,
/// reporting every value to `on_resolved`.
fn resolve_each(
    dimensions: &DimensionSet,
    variables: &[VariableDefinition],
    mut eval: impl FnMut(&str, &EvaluationContext) -> f64,
    mut on_resolved: impl FnMut(&VariableDefinition, f64),
) -> EvaluationContext {
    let mut context = EvaluationContext::from_dimensions(dimensions);
    for variable in variables {
        // Each formula sees every dimension and every earlier variable.
        let value = eval(&variable.formula, &context);
        context.insert(variable.name.clone(), value);
        on_resolved(variable, value);
    }
    context
}

/// Static problem found in a variable list.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableIssue {
    /// The formula does not parse; it resolves to `0`.
    InvalidFormula {
        variable: String,
        error: FormulaError,
    },
    /// The formula names a variable declared later in the list (or itself);
    /// at resolution time that name is still unknown and reads as `0`.
    ForwardReference { variable: String, reference: String },
    /// The formula names something that is neither a dimension nor a variable.
    UnknownReference { variable: String, reference: String },
    /// Two variables share a name; the later one wins in the context.
    DuplicateName { variable: String },
}

/// Lints a variable list without evaluating it.
pub fn check_variables(variables: &[VariableDefinition]) -> Vec<VariableIssue> {
    let declared: HashSet<&str> = variables.iter().map(|v| v.name.as_str()).collect();
    let mut known: HashSet<&str> = [LENGTH_VAR, WIDTH_VAR, DEPTH_VAR].into_iter().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut issues = Vec::new();

    for variable in variables {
        if !seen.insert(variable.name.as_str()) {
            issues.push(VariableIssue::DuplicateName {
                variable: variable.name.clone(),
            });
        }

        match Formula::parse(&variable.formula) {
            Ok(formula) => {
                for reference in formula.identifiers() {
                    if known.contains(reference.as_str()) {
                        continue;
                    }
                    let issue = if declared.contains(reference.as_str()) {
                        VariableIssue::ForwardReference {
                            variable: variable.name.clone(),
                            reference,
                        }
                    } else {
                        VariableIssue::UnknownReference {
                            variable: variable.name.clone(),
                            reference,
                        }
                    };
                    issues.push(issue);
                }
            }
            Err(error) => issues.push(VariableIssue::InvalidFormula {
                variable: variable.name.clone(),
                error,
            }),
        }

        known.insert(variable.name.as_str());
    }
    issues
}
