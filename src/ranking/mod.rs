//! Rankings
//!
//! A ranking orders nodes by descending suspiciousness. Nodes with equal
//! scores are ordered by ascending node key, so a ranking never depends on
//! the order in which scores were collected. NaN scores sort last.
//!
//! Which position a tied node *reports* is a separate, configurable policy
//! ([`TieBreak`]): the fault localization literature evaluates rankings under
//! best-case, worst-case and average-case assumptions.

pub mod normalized;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::spectra::NodeKey;

pub use normalized::{NormalizationStrategy, NormalizedRanking};

/// A node and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode<K> {
    pub node: K,
    pub score: f64,
}

/// Rank reported for nodes sharing a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First position of the tie group
    #[default]
    BestCase,
    /// Last position of the tie group
    WorstCase,
    /// Mean of first and last position
    Average,
    /// The node's own position in the ordered list
    Sequential,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestCase => write!(f, "best_case"),
            Self::WorstCase => write!(f, "worst_case"),
            Self::Average => write!(f, "average"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "best_case" | "best" => Ok(Self::BestCase),
            "worst_case" | "worst" => Ok(Self::WorstCase),
            "average" | "average_case" => Ok(Self::Average),
            "sequential" => Ok(Self::Sequential),
            _ => Err(SpectraError::UnknownTieBreak(s.to_string())),
        }
    }
}

/// Nodes ordered by descending score.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking<K: NodeKey> {
    entries: Vec<RankedNode<K>>,
    tie_break: TieBreak,
    #[serde(skip)]
    positions: HashMap<K, usize>,
}

impl<K: NodeKey> Ranking<K> {
    /// Rank `(node, score)` pairs. A node listed twice keeps its last score.
    pub fn new(scores: impl IntoIterator<Item = (K, f64)>, tie_break: TieBreak) -> Self {
        let unique: HashMap<K, f64> = scores.into_iter().collect();
        let mut entries: Vec<RankedNode<K>> = unique
            .into_iter()
            .map(|(node, score)| RankedNode { node, score })
            .collect();
        entries.sort_by(rank_order);
        Self::from_sorted(entries, tie_break)
    }

    /// Entries must already be in ranking order.
    pub(crate) fn from_sorted(entries: Vec<RankedNode<K>>, tie_break: TieBreak) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.node.clone(), i))
            .collect();
        Self {
            entries,
            tie_break,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedNode<K>> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[RankedNode<K>] {
        &self.entries
    }

    /// Nodes in ranking order.
    pub fn nodes(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|e| &e.node)
    }

    /// The `n` most suspicious entries.
    pub fn top(&self, n: usize) -> &[RankedNode<K>] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Same order, different reported ranks.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn contains(&self, node: &K) -> bool {
        self.positions.contains_key(node)
    }

    pub fn score(&self, node: &K) -> Option<f64> {
        self.positions.get(node).map(|&i| self.entries[i].score)
    }

    /// 1-based position in the ordered list.
    pub fn position(&self, node: &K) -> Option<usize> {
        self.positions.get(node).map(|&i| i + 1)
    }

    /// 1-based position of the first node sharing this node's score.
    pub fn best_rank(&self, node: &K) -> Option<usize> {
        let i = *self.positions.get(node)?;
        Some(self.tie_group(i).0 + 1)
    }

    /// 1-based position of the last node sharing this node's score.
    pub fn worst_rank(&self, node: &K) -> Option<usize> {
        let i = *self.positions.get(node)?;
        Some(self.tie_group(i).1 + 1)
    }

    /// Rank under the configured tie-break policy.
    pub fn rank(&self, node: &K) -> Option<f64> {
        let i = *self.positions.get(node)?;
        let (first, last) = self.tie_group(i);
        let rank = match self.tie_break {
            TieBreak::BestCase => first + 1,
            TieBreak::WorstCase => last + 1,
            TieBreak::Sequential => i + 1,
            TieBreak::Average => return Some((first + last) as f64 / 2.0 + 1.0),
        };
        Some(rank as f64)
    }

    /// Smallest non-NaN score.
    pub fn min_score(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|e| e.score)
            .filter(|s| !s.is_nan())
            .reduce(f64::min)
    }

    /// Largest non-NaN score.
    pub fn max_score(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|e| e.score)
            .filter(|s| !s.is_nan())
            .reduce(f64::max)
    }

    /// Inclusive index range of the entries sharing the score at `i`.
    fn tie_group(&self, i: usize) -> (usize, usize) {
        let score = self.entries[i].score;
        let mut first = i;
        while first > 0 && same_score(self.entries[first - 1].score, score) {
            first -= 1;
        }
        let mut last = i;
        while last + 1 < self.entries.len() && same_score(self.entries[last + 1].score, score) {
            last += 1;
        }
        (first, last)
    }
}

impl<K: NodeKey> PartialEq for Ranking<K> {
    fn eq(&self, other: &Self) -> bool {
        self.tie_break == other.tie_break && self.entries == other.entries
    }
}

impl<'a, K: NodeKey> IntoIterator for &'a Ranking<K> {
    type Item = &'a RankedNode<K>;
    type IntoIter = std::slice::Iter<'a, RankedNode<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn same_score(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Descending score, NaN last, ties by ascending key.
fn rank_order<K: Ord>(a: &RankedNode<K>, b: &RankedNode<K>) -> Ordering {
    let by_score = match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    };
    by_score.then_with(|| a.node.cmp(&b.node))
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
mod tests;
