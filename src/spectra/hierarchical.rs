//! Hierarchical Spectra
//!
//! Rolls the nodes of a child spectra up into coarser parent nodes
//! (line → method → class → package). A parent is involved in a trace iff
//! any of its children is. Layers read through to their child instead of
//! copying it, so any number of layers can be stacked and traces added to
//! the bottom spectra show up at every level.

use std::collections::{BTreeMap, BTreeSet};

use super::{NodeKey, SimilarityCache, SpectraSource, TraceOutcome};
use crate::error::Result;
use crate::localizer::{Localizable, Localizer};

/// Aggregation layer over a child spectra `S` with node keys `C`.
///
/// The child is held by value; pass `&spectra` to borrow a frozen spectra or
/// an `Rc<RefCell<Spectra<_>>>` to keep the bottom layer mutable.
pub struct HierarchicalSpectra<P: NodeKey, C: NodeKey, S: SpectraSource<C>> {
    child: S,
    parents: BTreeMap<P, BTreeSet<C>>,
    mapping_version: u64,
    localizer: Localizer<P>,
    similarities: SimilarityCache,
}

impl<P: NodeKey, C: NodeKey, S: SpectraSource<C>> HierarchicalSpectra<P, C, S> {
    pub fn new(child: S) -> Self {
        Self {
            child,
            parents: BTreeMap::new(),
            mapping_version: 0,
            localizer: Localizer::new(),
            similarities: SimilarityCache::default(),
        }
    }

    /// Build a layer by mapping every current child node to its parent.
    ///
    /// Child nodes mapped to `None` are left out of the layer.
    pub fn from_fn(child: S, parent_of: impl Fn(&C) -> Option<P>) -> Self {
        let mut layer = Self::new(child);
        for node in layer.child.node_ids() {
            if let Some(parent) = parent_of(&node) {
                layer.set_parent(parent, node);
            }
        }
        layer
    }

    /// Merge `child` into `parent`, creating the parent node if needed.
    pub fn set_parent(&mut self, parent: P, child: C) {
        self.parents.entry(parent).or_default().insert(child);
        self.mapping_version += 1;
    }

    /// The wrapped child spectra.
    pub fn child_spectra(&self) -> &S {
        &self.child
    }

    /// Child nodes merged into `parent`.
    pub fn children_of(&self, parent: &P) -> Option<&BTreeSet<C>> {
        self.parents.get(parent)
    }

    pub fn has_node(&self, parent: &P) -> bool {
        self.parents.contains_key(parent)
    }

    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    /// Parent node identifiers, in key order.
    pub fn nodes(&self) -> impl Iterator<Item = &P> {
        self.parents.keys()
    }

    pub fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        self.similarities.map::<P, _>(self, failing)
    }
}

impl<P: NodeKey, C: NodeKey, S: SpectraSource<C>> SpectraSource<P>
    for HierarchicalSpectra<P, C, S>
{
    fn node_ids(&self) -> Vec<P> {
        self.parents.keys().cloned().collect()
    }

    fn has_node(&self, node: &P) -> bool {
        self.parents.contains_key(node)
    }

    fn outcomes(&self) -> Vec<TraceOutcome> {
        self.child.outcomes()
    }

    fn is_involved(&self, trace: &str, node: &P) -> bool {
        self.parents
            .get(node)
            .is_some_and(|children| children.iter().any(|c| self.child.is_involved(trace, c)))
    }

    fn involved_nodes(&self, trace: &str) -> Vec<P> {
        let involved: BTreeSet<C> = self.child.involved_nodes(trace).into_iter().collect();
        self.parents
            .iter()
            .filter(|(_, children)| children.iter().any(|c| involved.contains(c)))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    fn similarity(&self, failing: &str, other: &str) -> Result<f64> {
        self.similarities.score::<P, _>(self, failing, other)
    }

    fn similarity_map(&self, failing: &str) -> Result<BTreeMap<String, f64>> {
        self.similarities.map::<P, _>(self, failing)
    }

    /// Both terms only ever grow, so the sum changes on every change below.
    fn version(&self) -> u64 {
        self.child.version().wrapping_add(self.mapping_version)
    }
}

impl<P: NodeKey, C: NodeKey, S: SpectraSource<C>> Localizable<P>
    for HierarchicalSpectra<P, C, S>
{
    fn localizer(&self) -> &Localizer<P> {
        &self.localizer
    }
}

#[cfg(test)]
#[path = "hierarchical_tests.rs"]
mod tests;
