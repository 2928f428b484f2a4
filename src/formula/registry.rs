//! Name-indexed formula lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::builtin::{
    Ample, ArithmeticMean, DStar2, DStar3, Goodman, Gp13, Hamming, M1, Ochiai, RogersTanimoto,
    RussellRao, Tarantula, Wong1,
};
use super::Formula;
use crate::error::{Result, SpectraError};

/// Formulas by case-insensitive name.
#[derive(Clone)]
pub struct FormulaRegistry {
    formulas: BTreeMap<String, Arc<dyn Formula>>,
}

impl FormulaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            formulas: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in formula.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Ample);
        registry.register(ArithmeticMean);
        registry.register(Gp13);
        registry.register(Goodman);
        registry.register(Hamming);
        registry.register(M1);
        registry.register(RogersTanimoto);
        registry.register(RussellRao);
        registry.register(Wong1);
        registry.register(Tarantula);
        registry.register(Ochiai);
        registry.register(DStar2);
        registry.register(DStar3);
        registry
    }

    /// Add a formula, replacing any formula with the same name.
    pub fn register(&mut self, formula: impl Formula + 'static) -> Option<Arc<dyn Formula>> {
        self.register_arc(Arc::new(formula))
    }

    pub fn register_arc(&mut self, formula: Arc<dyn Formula>) -> Option<Arc<dyn Formula>> {
        self.formulas.insert(formula.name().to_lowercase(), formula)
    }

    /// Look up a formula by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Formula>> {
        self.formulas
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SpectraError::UnknownFormula(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formulas.contains_key(&name.to_lowercase())
    }

    /// Display names of all registered formulas, sorted case-insensitively.
    pub fn names(&self) -> Vec<&str> {
        self.formulas.values().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for FormulaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaRegistry")
            .field("formulas", &self.names())
            .finish()
    }
}
