//! Program Spectra
//!
//! A spectra is the node × trace involvement matrix of one program under
//! test, plus the pass/fail outcome of every trace:
//!
//! ```text
//!          | Trace1 | Trace2 | Trace3 | ... | TraceN |
//!  --------|--------|--------|--------|-----|--------|
//!  Node1   |   1    |   0    |   0    | ... |   1    |
//!  Node2   |   1    |   0    |   1    | ... |   1    |
//!  ...     |  ...   |  ...   |  ...   | ... |  ...   |
//!  --------|--------|--------|--------|-----|--------|
//!  Passed  |   0    |   1    |   1    | ... |   1    |
//! ```
//!
//! The involvement relation is the single source of truth. Spectrum counts
//! and similarity scores are derived from it and cached against a version
//! counter that every mutation bumps.

pub mod hierarchical;
pub mod similarity;
mod trace;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, SpectraError};
use crate::localizer::{Localizable, Localizer};

pub use hierarchical::HierarchicalSpectra;
pub use similarity::SimilarityCache;
pub use trace::{Trace, TraceMut};

/// Requirements on node identifiers.
///
/// Any ordered, hashable key works: `String` locations, `(PathBuf, usize)`
/// line keys, or custom structs.
pub trait NodeKey: Clone + Eq + Ord + Hash + fmt::Debug {}

impl<T: Clone + Eq + Ord + Hash + fmt::Debug> NodeKey for T {}

/// A program element tracked by a spectra.
///
/// Nodes carry no state of their own; spectrum counts are derived from the
/// owning spectra's traces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node<K> {
    id: K,
}

impl<K> Node<K> {
    pub(crate) fn new(id: K) -> Self {
        Self { id }
    }

    pub fn identifier(&self) -> &K {
        &self.id
    }
}

/// Identifier and outcome of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceOutcome {
    pub id: String,
    pub successful: bool,
}

/// Read access to a spectra, shared by concrete spectra and aggregation layers.
///
/// Trace lists are returned in identifier order so that derived floating
/// point sums do not depend on insertion order.
pub trait SpectraSource<K: NodeKey> {
    /// All node identifiers, in key order.
    fn node_ids(&self) -> Vec<K>;

    fn has_node(&self, node: &K) -> bool;

    /// Identifier and outcome of every trace, in identifier order.
    fn outcomes(&self) -> Vec<TraceOutcome>;

    /// Whether `node` is involved in trace `trace`; false for unknown traces.
    fn is_involved(&self, trace: &str, node: &K) -> bool;

    /// Nodes involved in trace `trace`, in key order.
    fn involved_nodes(&self, trace: &str) -> Vec<K>;

    /// Similarity of trace `other` to the failing trace `failing`.
    fn similarity(&self, failing: &str, other: &str) -> Result<f64>;

    /// Similarity of every trace to the failing trace `failing`.
    fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>>;

    /// Changes whenever anything observable through this source changes.
    fn version(&self) -> u64;
}

// ============================================================================
// Spectra
// ============================================================================

/// Owns nodes and traces of one granularity level.
pub struct Spectra<K: NodeKey> {
    nodes: BTreeMap<K, Node<K>>,
    traces: BTreeMap<String, Trace<K>>,
    version: u64,
    localizer: Localizer<K>,
    similarities: SimilarityCache,
}

impl<K: NodeKey> Spectra<K> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            traces: BTreeMap::new(),
            version: 0,
            localizer: Localizer::new(),
            similarities: SimilarityCache::default(),
        }
    }

    /// Returns the node for `id`, registering it first if needed.
    pub fn get_or_create_node(&mut self, id: K) -> &Node<K> {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| Node::new(id))
    }

    pub fn node(&self, id: &K) -> Option<&Node<K>> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &K) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, in key order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<K>> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove a node and clear its involvement in every trace.
    ///
    /// Returns whether the node existed. Derived caches are invalidated
    /// either way.
    pub fn remove_node(&mut self, id: &K) -> bool {
        let existed = self.nodes.remove(id).is_some();
        if existed {
            for trace in self.traces.values_mut() {
                trace.clear(id);
            }
        }
        self.version += 1;
        debug!("Removed node {:?} (existed: {})", id, existed);
        existed
    }

    /// Register a new trace.
    ///
    /// Fails with [`SpectraError::DuplicateTrace`] if the identifier is
    /// already taken; the existing trace is left untouched.
    pub fn add_trace(
        &mut self,
        id: impl Into<String>,
        successful: bool,
    ) -> Result<TraceMut<'_, K>> {
        let id = id.into();
        if self.traces.contains_key(&id) {
            return Err(SpectraError::DuplicateTrace(id));
        }
        debug!("Adding trace {} (successful: {})", id, successful);
        self.version += 1;
        let trace = self
            .traces
            .entry(id.clone())
            .or_insert_with(|| Trace::new(id, successful));
        Ok(TraceMut {
            trace,
            nodes: &mut self.nodes,
            version: &mut self.version,
        })
    }

    pub fn trace(&self, id: &str) -> Option<&Trace<K>> {
        self.traces.get(id)
    }

    /// Mutable handle to an existing trace.
    pub fn trace_mut(&mut self, id: &str) -> Option<TraceMut<'_, K>> {
        let trace = self.traces.get_mut(id)?;
        Some(TraceMut {
            trace,
            nodes: &mut self.nodes,
            version: &mut self.version,
        })
    }

    /// All traces, in identifier order.
    pub fn traces(&self) -> impl Iterator<Item = &Trace<K>> {
        self.traces.values()
    }

    pub fn failing_traces(&self) -> Vec<&Trace<K>> {
        self.traces.values().filter(|t| t.is_failing()).collect()
    }

    pub fn successful_traces(&self) -> Vec<&Trace<K>> {
        self.traces.values().filter(|t| t.is_successful()).collect()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    pub fn failing_trace_count(&self) -> usize {
        self.traces.values().filter(|t| t.is_failing()).count()
    }

    /// Similarity of every trace to a failing trace.
    ///
    /// Computed for all failing traces on first request and cached until the
    /// next mutation.
    pub fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        self.similarities.map::<K, _>(self, failing)
    }

    /// Force derived values to be recomputed on next access.
    ///
    /// Mutations through the spectra already do this; the call exists for
    /// callers that want to drop cached memory eagerly.
    pub fn invalidate_cached_values(&mut self) {
        self.version += 1;
        self.localizer.invalidate_cached_values();
        self.similarities.invalidate();
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<K: NodeKey> Default for Spectra<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeKey> Clone for Spectra<K> {
    /// Clones the coverage data; caches start out empty.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            traces: self.traces.clone(),
            version: self.version,
            localizer: Localizer::new(),
            similarities: SimilarityCache::default(),
        }
    }
}

impl<K: NodeKey> fmt::Debug for Spectra<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spectra")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("traces", &self.traces.values().collect::<Vec<_>>())
            .field("version", &self.version)
            .finish()
    }
}

impl<K: NodeKey> PartialEq for Spectra<K> {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self.failing_trace_count() == other.failing_trace_count()
            && self.nodes.keys().eq(other.nodes.keys())
            && self.traces == other.traces
    }
}

impl<K: NodeKey> Eq for Spectra<K> {}

impl<K: NodeKey> Hash for Spectra<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nodes.len().hash(state);
        self.traces.len().hash(state);
        self.failing_trace_count().hash(state);
        for id in self.nodes.keys() {
            id.hash(state);
        }
        for trace in self.traces.values() {
            trace.hash(state);
        }
    }
}

impl<K: NodeKey> SpectraSource<K> for Spectra<K> {
    fn node_ids(&self) -> Vec<K> {
        self.nodes.keys().cloned().collect()
    }

    fn has_node(&self, node: &K) -> bool {
        self.nodes.contains_key(node)
    }

    fn outcomes(&self) -> Vec<TraceOutcome> {
        self.traces
            .values()
            .map(|t| TraceOutcome {
                id: t.id().to_string(),
                successful: t.is_successful(),
            })
            .collect()
    }

    fn is_involved(&self, trace: &str, node: &K) -> bool {
        self.traces
            .get(trace)
            .is_some_and(|t| t.is_involved(node))
    }

    fn involved_nodes(&self, trace: &str) -> Vec<K> {
        self.traces
            .get(trace)
            .map(|t| t.involved_nodes().cloned().collect())
            .unwrap_or_default()
    }

    fn similarity(&self, failing: &str, other: &str) -> Result<f64> {
        self.similarities.score::<K, _>(self, failing, other)
    }

    fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        self.similarities.map::<K, _>(self, failing)
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl<K: NodeKey> Localizable<K> for Spectra<K> {
    fn localizer(&self) -> &Localizer<K> {
        &self.localizer
    }
}

// ============================================================================
// Shared sources
// ============================================================================

impl<K: NodeKey, S: SpectraSource<K> + ?Sized> SpectraSource<K> for &S {
    fn node_ids(&self) -> Vec<K> {
        (**self).node_ids()
    }

    fn has_node(&self, node: &K) -> bool {
        (**self).has_node(node)
    }

    fn outcomes(&self) -> Vec<TraceOutcome> {
        (**self).outcomes()
    }

    fn is_involved(&self, trace: &str, node: &K) -> bool {
        (**self).is_involved(trace, node)
    }

    fn involved_nodes(&self, trace: &str) -> Vec<K> {
        (**self).involved_nodes(trace)
    }

    fn similarity(&self, failing: &str, other: &str) -> Result<f64> {
        (**self).similarity(failing, other)
    }

    fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        (**self).similarity_map(failing)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}

/// A spectra that stays mutable while layers are stacked on top of it.
impl<K: NodeKey, S: SpectraSource<K>> SpectraSource<K> for Rc<RefCell<S>> {
    fn node_ids(&self) -> Vec<K> {
        self.borrow().node_ids()
    }

    fn has_node(&self, node: &K) -> bool {
        self.borrow().has_node(node)
    }

    fn outcomes(&self) -> Vec<TraceOutcome> {
        self.borrow().outcomes()
    }

    fn is_involved(&self, trace: &str, node: &K) -> bool {
        self.borrow().is_involved(trace, node)
    }

    fn involved_nodes(&self, trace: &str) -> Vec<K> {
        self.borrow().involved_nodes(trace)
    }

    fn similarity(&self, failing: &str, other: &str) -> Result<f64> {
        self.borrow().similarity(failing, other)
    }

    fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        self.borrow().similarity_map(failing)
    }

    fn version(&self) -> u64 {
        self.borrow().version()
    }
}

#[cfg(test)]
#[path = "spectra_tests.rs"]
mod tests;
