//! Spectrum Statistics
//!
//! Computes and caches the four spectrum counts per node:
//!
//! | Count | Traces counted |
//! |-------|----------------|
//! | EF | failing, node involved |
//! | EP | passing, node involved |
//! | NF | failing, node not involved |
//! | NP | passing, node not involved |
//!
//! Two computation strategies are supported. `Standard` counts each matching
//! trace once. `Similarity` weights each matching trace by its similarity to
//! every failing trace and averages over the failing traces.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SpectraError};
use crate::formula::{Formula, SpectrumCounts};
use crate::ranking::{Ranking, TieBreak};
use crate::spectra::{NodeKey, SpectraSource, TraceOutcome};

/// How spectrum counts are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComputationStrategy {
    /// Each matching trace counts 1
    #[default]
    Standard,
    /// Matching traces weighted by similarity to the failing traces
    Similarity,
}

impl fmt::Display for ComputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Similarity => write!(f, "similarity"),
        }
    }
}

impl FromStr for ComputationStrategy {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "standard_sbfl" => Ok(Self::Standard),
            "similarity" | "similarity_sbfl" => Ok(Self::Similarity),
            _ => Err(SpectraError::UnsupportedStrategy(s.to_string())),
        }
    }
}

/// Counts memoized for one source version.
#[derive(Debug)]
struct StatisticsCache<K> {
    version: u64,
    outcomes: Vec<TraceOutcome>,
    counts: HashMap<(ComputationStrategy, K), SpectrumCounts>,
}

/// Per-spectra statistics cache.
///
/// The cache remembers the source version it was filled at and starts over
/// as soon as the source reports a different one, so mutations of the
/// involvement relation never produce stale counts.
///
/// A `Localizer` belongs to exactly one source: the version does not tell
/// two sources apart. Outside this crate it is only reachable through
/// [`Localizable::localizer`], which ties it to the spectra that owns it.
#[derive(Debug)]
pub struct Localizer<K: NodeKey> {
    cache: RefCell<Option<StatisticsCache<K>>>,
}

impl<K: NodeKey> Localizer<K> {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(None),
        }
    }

    /// All four counts of `node` under `strategy`.
    pub(crate) fn counts<S>(
        &self,
        source: &S,
        node: &K,
        strategy: ComputationStrategy,
    ) -> Result<SpectrumCounts>
    where
        S: SpectraSource<K> + ?Sized,
    {
        let version = source.version();
        {
            let mut cache = self.cache.borrow_mut();
            if cache.as_ref().is_none_or(|c| c.version != version) {
                debug!("Resetting statistics cache at version {}", version);
                *cache = Some(StatisticsCache {
                    version,
                    outcomes: source.outcomes(),
                    counts: HashMap::new(),
                });
            }
            let key = (strategy, node.clone());
            if let Some(counts) = cache.as_ref().and_then(|c| c.counts.get(&key)) {
                return Ok(*counts);
            }
        }

        let counts = {
            let cache = self.cache.borrow();
            let outcomes = cache.as_ref().map_or(&[][..], |c| c.outcomes.as_slice());
            match strategy {
                ComputationStrategy::Standard => standard_counts(source, outcomes, node),
                ComputationStrategy::Similarity => similarity_counts(source, outcomes, node)?,
            }
        };

        if let Some(cache) = self.cache.borrow_mut().as_mut() {
            cache.counts.insert((strategy, node.clone()), counts);
        }
        Ok(counts)
    }

    pub(crate) fn ef<S>(&self, source: &S, node: &K, strategy: ComputationStrategy) -> Result<f64>
    where
        S: SpectraSource<K> + ?Sized,
    {
        Ok(self.counts(source, node, strategy)?.ef)
    }

    pub(crate) fn ep<S>(&self, source: &S, node: &K, strategy: ComputationStrategy) -> Result<f64>
    where
        S: SpectraSource<K> + ?Sized,
    {
        Ok(self.counts(source, node, strategy)?.ep)
    }

    pub(crate) fn nf<S>(&self, source: &S, node: &K, strategy: ComputationStrategy) -> Result<f64>
    where
        S: SpectraSource<K> + ?Sized,
    {
        Ok(self.counts(source, node, strategy)?.nf)
    }

    pub(crate) fn np<S>(&self, source: &S, node: &K, strategy: ComputationStrategy) -> Result<f64>
    where
        S: SpectraSource<K> + ?Sized,
    {
        Ok(self.counts(source, node, strategy)?.np)
    }

    /// Drop every memoized count.
    pub fn invalidate_cached_values(&self) {
        self.cache.borrow_mut().take();
    }

    /// Score every node of `source` with `formula` and rank the results.
    pub(crate) fn localize<S>(
        &self,
        source: &S,
        formula: &dyn Formula,
        strategy: ComputationStrategy,
        tie_break: TieBreak,
    ) -> Result<Ranking<K>>
    where
        S: SpectraSource<K> + ?Sized,
    {
        let nodes = source.node_ids();
        info!(
            "Localizing {} node(s) with {} ({} strategy)",
            nodes.len(),
            formula.name(),
            strategy
        );

        let mut scores = Vec::with_capacity(nodes.len());
        for node in nodes {
            let counts = self.counts(source, &node, strategy)?;
            scores.push((node, formula.suspiciousness(&counts)));
        }
        Ok(Ranking::new(scores, tie_break))
    }
}

impl<K: NodeKey> Default for Localizer<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn standard_counts<K, S>(source: &S, outcomes: &[TraceOutcome], node: &K) -> SpectrumCounts
where
    K: NodeKey,
    S: SpectraSource<K> + ?Sized,
{
    let mut counts = SpectrumCounts::default();
    for trace in outcomes {
        let involved = source.is_involved(&trace.id, node);
        *counts.slot_mut(trace.successful, involved) += 1.0;
    }
    counts
}

fn similarity_counts<K, S>(
    source: &S,
    outcomes: &[TraceOutcome],
    node: &K,
) -> Result<SpectrumCounts>
where
    K: NodeKey,
    S: SpectraSource<K> + ?Sized,
{
    let failing: Vec<&TraceOutcome> = outcomes.iter().filter(|t| !t.successful).collect();
    if failing.is_empty() {
        return Ok(SpectrumCounts::default());
    }

    let involvement: Vec<bool> = outcomes
        .iter()
        .map(|trace| source.is_involved(&trace.id, node))
        .collect();

    let mut counts = SpectrumCounts::default();
    for failing_trace in &failing {
        for (trace, &involved) in outcomes.iter().zip(&involvement) {
            let score = source.similarity(&failing_trace.id, &trace.id)?;
            *counts.slot_mut(trace.successful, involved) += score;
        }
    }

    let n = failing.len() as f64;
    Ok(SpectrumCounts::new(
        counts.ef / n,
        counts.ep / n,
        counts.nf / n,
        counts.np / n,
    ))
}

/// Spectra that own a statistics cache.
///
/// Provides the per-node counts and localization directly on the spectra.
pub trait Localizable<K: NodeKey>: SpectraSource<K> + Sized {
    fn localizer(&self) -> &Localizer<K>;

    fn counts(&self, node: &K, strategy: ComputationStrategy) -> Result<SpectrumCounts> {
        self.localizer().counts(self, node, strategy)
    }

    fn ef(&self, node: &K, strategy: ComputationStrategy) -> Result<f64> {
        self.localizer().ef(self, node, strategy)
    }

    fn ep(&self, node: &K, strategy: ComputationStrategy) -> Result<f64> {
        self.localizer().ep(self, node, strategy)
    }

    fn nf(&self, node: &K, strategy: ComputationStrategy) -> Result<f64> {
        self.localizer().nf(self, node, strategy)
    }

    fn np(&self, node: &K, strategy: ComputationStrategy) -> Result<f64> {
        self.localizer().np(self, node, strategy)
    }

    /// Suspiciousness of a single node.
    fn suspiciousness(
        &self,
        formula: &dyn Formula,
        node: &K,
        strategy: ComputationStrategy,
    ) -> Result<f64> {
        Ok(formula.suspiciousness(&self.counts(node, strategy)?))
    }

    /// Rank every node by `formula`.
    fn localize(
        &self,
        formula: &dyn Formula,
        strategy: ComputationStrategy,
        tie_break: TieBreak,
    ) -> Result<Ranking<K>> {
        self.localizer().localize(self, formula, strategy, tie_break)
    }
}

#[cfg(test)]
#[path = "localizer_tests.rs"]
mod tests;
