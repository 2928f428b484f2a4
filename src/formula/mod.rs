//! Suspiciousness Formulas
//!
//! A formula maps the four spectrum counts of a node to a suspiciousness
//! score; higher means more likely faulty. Formulas are pure and selected by
//! name through a [`FormulaRegistry`], which accepts user-defined formulas
//! next to the built-in ones.
//!
//! Division by zero never produces NaN or infinity: a zero numerator yields
//! 0 and a nonzero numerator over a zero denominator yields `f64::MAX`.
//!
//! References:
//! - Wong et al. (2016) "A Survey on Software Fault Localization" - IEEE TSE
//! - Naish et al. (2011) "A model for spectra-based software diagnosis" - TOSEM
//! - Yoo (2012) "Evolving human competitive spectra-based fault localisation techniques" - SSBSE

mod builtin;
mod registry;

use serde::{Deserialize, Serialize};

pub use builtin::{
    Ample, ArithmeticMean, DStar2, DStar3, Goodman, Gp13, Hamming, M1, Ochiai, RogersTanimoto,
    RussellRao, Tarantula, Wong1,
};
pub use registry::FormulaRegistry;

/// The four spectrum counts of a node.
///
/// Plain counts under the standard strategy, similarity-weighted sums under
/// the similarity strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumCounts {
    /// Failing traces involving the node
    pub ef: f64,
    /// Passing traces involving the node
    pub ep: f64,
    /// Failing traces not involving the node
    pub nf: f64,
    /// Passing traces not involving the node
    pub np: f64,
}

impl SpectrumCounts {
    pub fn new(ef: f64, ep: f64, nf: f64, np: f64) -> Self {
        Self { ef, ep, nf, np }
    }

    /// Sum of all four counts (the trace count under the standard strategy).
    pub fn total(&self) -> f64 {
        self.ef + self.ep + self.nf + self.np
    }

    pub(crate) fn slot_mut(&mut self, successful: bool, involved: bool) -> &mut f64 {
        match (successful, involved) {
            (false, true) => &mut self.ef,
            (true, true) => &mut self.ep,
            (false, false) => &mut self.nf,
            (true, false) => &mut self.np,
        }
    }
}

/// A suspiciousness formula.
pub trait Formula: Send + Sync {
    /// Display name; registry lookups ignore case.
    fn name(&self) -> &str;

    fn suspiciousness(&self, counts: &SpectrumCounts) -> f64;
}

/// Formula backed by a closure.
pub struct FnFormula<F> {
    name: String,
    f: F,
}

impl<F> FnFormula<F>
where
    F: Fn(&SpectrumCounts) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Formula for FnFormula<F>
where
    F: Fn(&SpectrumCounts) -> f64 + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn suspiciousness(&self, counts: &SpectrumCounts) -> f64 {
        (self.f)(counts)
    }
}

/// `numerator / denominator` with the zero guards shared by all formulas.
pub(crate) fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if numerator == 0.0 {
        0.0
    } else if denominator == 0.0 {
        f64::MAX.copysign(numerator)
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
#[path = "formula_tests.rs"]
mod tests;
