//! Execution traces and their node involvement.

use std::collections::BTreeMap;
use std::ops::Deref;

use super::{Node, NodeKey};

/// A single execution (usually one test run) and its success state.
///
/// Involvement is stored as a hit count per node. A node is involved iff its
/// hit count is nonzero; plain boolean involvement records a single hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trace<K> {
    id: String,
    successful: bool,
    hits: BTreeMap<K, u64>,
}

impl<K: NodeKey> Trace<K> {
    pub(crate) fn new(id: impl Into<String>, successful: bool) -> Self {
        Self {
            id: id.into(),
            successful,
            hits: BTreeMap::new(),
        }
    }

    /// Trace identifier (usually the test case name).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the execution passed.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Whether the execution failed.
    pub fn is_failing(&self) -> bool {
        !self.successful
    }

    pub fn is_involved(&self, node: &K) -> bool {
        self.hits.contains_key(node)
    }

    /// Hit count of a node, 0 when not involved.
    pub fn hits(&self, node: &K) -> u64 {
        self.hits.get(node).copied().unwrap_or(0)
    }

    /// Nodes involved in this trace, in key order.
    pub fn involved_nodes(&self) -> impl Iterator<Item = &K> {
        self.hits.keys()
    }

    /// Number of involved nodes.
    pub fn involvement_count(&self) -> usize {
        self.hits.len()
    }

    /// Zero hits removes the entry so that `hits` only ever holds involved nodes.
    pub(crate) fn set_hits(&mut self, node: K, hits: u64) {
        if hits > 0 {
            self.hits.insert(node, hits);
        } else {
            self.hits.remove(&node);
        }
    }

    pub(crate) fn clear(&mut self, node: &K) {
        self.hits.remove(node);
    }
}

/// Mutable handle to a trace owned by a [`Spectra`](super::Spectra).
///
/// Every write goes through the owning spectra so that nodes get registered
/// and derived caches see the change.
pub struct TraceMut<'a, K> {
    pub(super) trace: &'a mut Trace<K>,
    pub(super) nodes: &'a mut BTreeMap<K, Node<K>>,
    pub(super) version: &'a mut u64,
}

impl<K: NodeKey> TraceMut<'_, K> {
    /// Mark a node as (not) involved. Involvement records a single hit.
    pub fn set_involvement(&mut self, node: K, involved: bool) -> &mut Self {
        self.set_hits(node, u64::from(involved))
    }

    /// Record the hit count of a node; the node is registered if unknown.
    pub fn set_hits(&mut self, node: K, hits: u64) -> &mut Self {
        self.nodes
            .entry(node.clone())
            .or_insert_with(|| Node::new(node.clone()));
        self.trace.set_hits(node, hits);
        *self.version += 1;
        self
    }
}

impl<K> Deref for TraceMut<'_, K> {
    type Target = Trace<K>;

    fn deref(&self) -> &Self::Target {
        self.trace
    }
}
