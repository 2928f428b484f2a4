//! Rescaled rankings.
//!
//! Normalization maps raw suspiciousness values onto a fixed range so that
//! rankings produced by different formulas can be compared. Every strategy
//! is monotone and the normalized entries keep the node order of the source
//! ranking, even where rounding collapses two raw scores onto one value.
//! Normalizing an already normalized ranking with the same strategy leaves
//! it unchanged.
//!
//! Saturated scores (`±f64::MAX`, what a zero denominator produces) are
//! treated like infinities: they map onto the bounds and do not stretch the
//! range the remaining scores are rescaled over.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{RankedNode, Ranking};
use crate::error::{Result, SpectraError};
use crate::spectra::NodeKey;

/// How ranking values are rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// Scores rescaled linearly into [0, 1]
    #[default]
    ZeroToOneRankingValue,
    /// Rank mapped linearly into [0, 1], best rank = 1
    ZeroToOneRanking,
    /// 1 / rank
    ReciprocalRank,
}

impl fmt::Display for NormalizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroToOneRankingValue => write!(f, "zero_to_one_ranking_value"),
            Self::ZeroToOneRanking => write!(f, "zero_to_one_ranking"),
            Self::ReciprocalRank => write!(f, "reciprocal_rank"),
        }
    }
}

impl FromStr for NormalizationStrategy {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "zero_to_one_ranking_value" | "zerotoonerankingvalue" | "value" => {
                Ok(Self::ZeroToOneRankingValue)
            }
            "zero_to_one_ranking" | "zerotooneranking" | "rank" => Ok(Self::ZeroToOneRanking),
            "reciprocal_rank" | "reciprocalrank" | "reciprocal" => Ok(Self::ReciprocalRank),
            _ => Err(SpectraError::UnknownNormalization(s.to_string())),
        }
    }
}

/// A ranking together with its normalized counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRanking<K: NodeKey> {
    strategy: NormalizationStrategy,
    source: Ranking<K>,
    normalized: Ranking<K>,
}

impl<K: NodeKey> NormalizedRanking<K> {
    pub fn new(source: Ranking<K>, strategy: NormalizationStrategy) -> Self {
        let entries = match strategy {
            NormalizationStrategy::ZeroToOneRankingValue => rescale_values(&source),
            NormalizationStrategy::ZeroToOneRanking => {
                let n = source.len();
                by_rank(&source, |rank| {
                    if n <= 1 {
                        1.0
                    } else {
                        1.0 - (rank - 1.0) / (n - 1) as f64
                    }
                })
            }
            NormalizationStrategy::ReciprocalRank => by_rank(&source, |rank| 1.0 / rank),
        };
        let normalized = Ranking::from_sorted(entries, source.tie_break());
        Self {
            strategy,
            source,
            normalized,
        }
    }

    pub fn strategy(&self) -> NormalizationStrategy {
        self.strategy
    }

    /// The ranking before normalization.
    pub fn source(&self) -> &Ranking<K> {
        &self.source
    }

    /// The normalized ranking.
    pub fn ranking(&self) -> &Ranking<K> {
        &self.normalized
    }

    /// Normalized value of `node`.
    pub fn score(&self, node: &K) -> Option<f64> {
        self.normalized.score(node)
    }

    /// Raw value of `node` before normalization.
    pub fn original_score(&self, node: &K) -> Option<f64> {
        self.source.score(node)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedNode<K>> {
        self.normalized.iter()
    }

    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn into_ranking(self) -> Ranking<K> {
        self.normalized
    }
}

impl<K: NodeKey> Ranking<K> {
    /// Normalize a copy of this ranking.
    pub fn normalize(&self, strategy: NormalizationStrategy) -> NormalizedRanking<K> {
        NormalizedRanking::new(self.clone(), strategy)
    }
}

fn is_saturated(score: f64) -> bool {
    score.is_infinite() || score.abs() == f64::MAX
}

fn rescale_values<K: NodeKey>(ranking: &Ranking<K>) -> Vec<RankedNode<K>> {
    let finite = ranking
        .iter()
        .map(|e| e.score)
        .filter(|s| !s.is_nan() && !is_saturated(*s));
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });
    let range = max - min;
    let degenerate = !(range.is_finite() && range > 0.0);
    if degenerate && !ranking.is_empty() {
        warn!(
            "Normalizing {} value(s) with degenerate range [{}, {}]",
            ranking.len(),
            min,
            max
        );
    }

    ranking
        .iter()
        .map(|e| {
            let score = if e.score.is_nan() {
                f64::NAN
            } else if is_saturated(e.score) {
                if e.score > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else if degenerate {
                0.0
            } else {
                ((e.score - min) / range).clamp(0.0, 1.0)
            };
            RankedNode {
                node: e.node.clone(),
                score,
            }
        })
        .collect()
}

fn by_rank<K: NodeKey>(ranking: &Ranking<K>, f: impl Fn(f64) -> f64) -> Vec<RankedNode<K>> {
    ranking
        .iter()
        .filter_map(|e| {
            let score = f(ranking.rank(&e.node)?);
            Some(RankedNode {
                node: e.node.clone(),
                score,
            })
        })
        .collect()
}
