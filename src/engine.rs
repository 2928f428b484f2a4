//! Fault Localization Engine
//!
//! Resolves a [`LocalizationConfig`] into a formula, a computation strategy
//! and ranking options, and runs them against any spectra that owns a
//! statistics cache.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::LocalizationConfig;
use crate::error::Result;
use crate::formula::{Formula, FormulaRegistry};
use crate::localizer::{ComputationStrategy, Localizable};
use crate::ranking::{NormalizationStrategy, NormalizedRanking, Ranking, TieBreak};
use crate::spectra::NodeKey;

/// Result of one localization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Localization<K: NodeKey> {
    /// Formula display name
    pub formula: String,
    pub strategy: ComputationStrategy,
    /// Raw suspiciousness ranking
    pub ranking: Ranking<K>,
    /// Present when normalization was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedRanking<K>>,
}

impl<K: NodeKey> Localization<K> {
    /// The normalized ranking if present, the raw one otherwise.
    pub fn final_ranking(&self) -> &Ranking<K> {
        self.normalized
            .as_ref()
            .map_or(&self.ranking, NormalizedRanking::ranking)
    }
}

/// Configured fault localizer.
#[derive(Clone)]
pub struct FaultLocalizer {
    formula: Arc<dyn Formula>,
    strategy: ComputationStrategy,
    tie_break: TieBreak,
    normalization: Option<NormalizationStrategy>,
}

impl FaultLocalizer {
    /// Localizer with the given formula and default options.
    pub fn new(formula: Arc<dyn Formula>) -> Self {
        Self {
            formula,
            strategy: ComputationStrategy::default(),
            tie_break: TieBreak::default(),
            normalization: None,
        }
    }

    /// Resolve `config` against `registry`.
    pub fn from_config(config: &LocalizationConfig, registry: &FormulaRegistry) -> Result<Self> {
        config.validate(registry)?;
        Ok(Self {
            formula: registry.get(&config.formula)?,
            strategy: config.strategy,
            tie_break: config.tie_break,
            normalization: config.normalization,
        })
    }

    pub fn with_strategy(mut self, strategy: ComputationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_normalization(mut self, normalization: Option<NormalizationStrategy>) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn formula(&self) -> &dyn Formula {
        self.formula.as_ref()
    }

    pub fn strategy(&self) -> ComputationStrategy {
        self.strategy
    }

    /// Rank every node of `spectra`.
    pub fn localize<K, S>(&self, spectra: &S) -> Result<Localization<K>>
    where
        K: NodeKey,
        S: Localizable<K>,
    {
        let ranking = spectra.localize(self.formula.as_ref(), self.strategy, self.tie_break)?;
        let normalized = self.normalization.map(|strategy| ranking.normalize(strategy));
        if let Some(top) = ranking.top(1).first() {
            info!(
                "Most suspicious node with {}: {:?} ({})",
                self.formula.name(),
                top.node,
                top.score
            );
        }
        Ok(Localization {
            formula: self.formula.name().to_string(),
            strategy: self.strategy,
            ranking,
            normalized,
        })
    }
}

impl fmt::Debug for FaultLocalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultLocalizer")
            .field("formula", &self.formula.name())
            .field("strategy", &self.strategy)
            .field("tie_break", &self.tie_break)
            .field("normalization", &self.normalization)
            .finish()
    }
}
