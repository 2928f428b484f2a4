//! Trace-to-trace similarity used by the similarity-weighted strategy.
//!
//! For a failing trace `F` with involved nodes `I(F)` and any trace `G`:
//!
//! ```text
//! similarity(F, G) = |I(F) ∩ I(G)| / |I(F)|
//! ```
//!
//! A failing trace that involves no node has similarity 0 to every trace.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{NodeKey, SpectraSource};
use crate::error::{Result, SpectraError};

/// failing trace id -> (trace id -> score)
type SimilarityTable = HashMap<String, BTreeMap<String, f64>>;

/// Lazily computed similarity scores, valid for one source version.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    state: RefCell<Option<(u64, SimilarityTable)>>,
}

impl SimilarityCache {
    /// Similarity of `other` to the failing trace `failing`.
    pub fn score<K, S>(&self, source: &S, failing: &str, other: &str) -> Result<f64>
    where
        K: NodeKey,
        S: SpectraSource<K> + ?Sized,
    {
        self.with_scores::<K, S, _>(source, failing, |scores| {
            scores
                .get(other)
                .copied()
                .ok_or_else(|| SpectraError::UnknownTrace(other.to_string()))
        })
    }

    /// Similarity of every trace to the failing trace `failing`.
    pub fn map<K, S>(&self, source: &S, failing: &str) -> Result<BTreeMap<String, f64>>
    where
        K: NodeKey,
        S: SpectraSource<K> + ?Sized,
    {
        self.with_scores::<K, S, _>(source, failing, |scores| Ok(scores.clone()))
    }

    /// Drop the cached table.
    pub fn invalidate(&self) {
        self.state.borrow_mut().take();
    }

    fn with_scores<K, S, T>(
        &self,
        source: &S,
        failing: &str,
        f: impl FnOnce(&BTreeMap<String, f64>) -> Result<T>,
    ) -> Result<T>
    where
        K: NodeKey,
        S: SpectraSource<K> + ?Sized,
    {
        let version = source.version();
        let stale = self
            .state
            .borrow()
            .as_ref()
            .is_none_or(|(cached, _)| *cached != version);
        if stale {
            let table = compute_similarities(source);
            *self.state.borrow_mut() = Some((version, table));
        }

        let state = self.state.borrow();
        let Some((_, table)) = state.as_ref() else {
            return Err(SpectraError::UnknownTrace(failing.to_string()));
        };
        match table.get(failing) {
            Some(scores) => f(scores),
            None => Err(classify_missing(source, failing)),
        }
    }
}

/// A trace absent from the table is either unknown or not failing.
fn classify_missing<K, S>(source: &S, trace: &str) -> SpectraError
where
    K: NodeKey,
    S: SpectraSource<K> + ?Sized,
{
    if source.outcomes().iter().any(|o| o.id == trace) {
        SpectraError::NotAFailingTrace(trace.to_string())
    } else {
        SpectraError::UnknownTrace(trace.to_string())
    }
}

/// Compute the similarity of every trace to every failing trace.
fn compute_similarities<K, S>(source: &S) -> SimilarityTable
where
    K: NodeKey,
    S: SpectraSource<K> + ?Sized,
{
    let outcomes = source.outcomes();
    let mut table = SimilarityTable::new();

    for failing in outcomes.iter().filter(|o| !o.successful) {
        let involved = source.involved_nodes(&failing.id);
        let size = involved.len() as f64;

        let scores = outcomes
            .iter()
            .map(|trace| {
                let score = if involved.is_empty() {
                    0.0
                } else {
                    let shared = involved
                        .iter()
                        .filter(|node| source.is_involved(&trace.id, node))
                        .count();
                    shared as f64 / size
                };
                (trace.id.clone(), score)
            })
            .collect();
        table.insert(failing.id.clone(), scores);
    }

    debug!(
        "Computed similarity scores for {} failing trace(s) at version {}",
        table.len(),
        source.version()
    );
    table
}
