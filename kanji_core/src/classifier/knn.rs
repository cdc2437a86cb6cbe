//! k-nearest-neighbor classification over raw training samples.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{mode, StrokeClassifier, Tally};
use crate::error::{KanjiError, KanjiResult};
use crate::features::FeatureVector;
use crate::metric::{DistanceMetric, FeatureWeights, WeightedManhattan};

/// Configuration for [`NearestNeighbor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Number of neighbors that vote
    pub k: usize,
    pub weights: FeatureWeights,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 3,
            weights: FeatureWeights::DISTANCES_ONLY,
        }
    }
}

impl KnnConfig {
    pub fn validate(&self) -> KanjiResult<()> {
        if self.k == 0 {
            return Err(KanjiError::invalid_config("knn.k", "0", "must be >= 1"));
        }
        self.weights.validate()
    }
}

/// A training sample ranked against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position in the candidate list
    pub index: usize,
    pub label: char,
    pub distance: f64,
}

/// Majority vote among the k closest training samples.
///
/// Candidates at equal distance keep their training order, and vote ties go
/// to the label met first in that ranked order.
#[derive(Debug, Clone)]
pub struct NearestNeighbor<M = WeightedManhattan> {
    config: KnnConfig,
    metric: M,
    candidates: Vec<FeatureVector>,
    tally: Tally,
}

impl NearestNeighbor<WeightedManhattan> {
    pub fn new(config: KnnConfig) -> KanjiResult<Self> {
        Self::with_metric(config, WeightedManhattan)
    }
}

impl<M: DistanceMetric> NearestNeighbor<M> {
    pub fn with_metric(config: KnnConfig, metric: M) -> KanjiResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metric,
            candidates: Vec::new(),
            tally: Tally::default(),
        })
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    pub fn candidates(&self) -> &[FeatureVector] {
        &self.candidates
    }

    /// Append one labeled training sample.
    pub fn train(&mut self, sample: FeatureVector) -> KanjiResult<()> {
        if sample.label().is_none() {
            return Err(KanjiError::missing_label(format!(
                "knn training sample {}",
                self.candidates.len()
            )));
        }
        self.candidates.push(sample);
        Ok(())
    }

    /// The `min(k, candidates)` closest candidates, nearest first.
    pub fn neighbors(&self, query: &FeatureVector) -> KanjiResult<Vec<Neighbor>> {
        if self.candidates.is_empty() {
            return Err(KanjiError::empty_candidates(self.name()));
        }

        let weights = self.config.weights;
        let distances: Vec<f64> = self
            .candidates
            .par_iter()
            .map(|candidate| self.metric.distance(candidate, query, &weights))
            .collect();

        let mut order: Vec<usize> = (0..distances.len()).collect();
        order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        order.truncate(self.config.k);

        order
            .into_iter()
            .map(|index| {
                let label = self.candidates[index]
                    .label()
                    .ok_or_else(|| KanjiError::missing_label(format!("knn candidate {}", index)))?;
                Ok(Neighbor {
                    index,
                    label,
                    distance: distances[index],
                })
            })
            .collect()
    }
}

impl<M: DistanceMetric> StrokeClassifier for NearestNeighbor<M> {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn fit(&mut self, training: &[FeatureVector]) -> KanjiResult<()> {
        self.candidates.clear();
        for sample in training {
            self.train(sample.clone())?;
        }
        trace!(candidates = self.candidates.len(), "knn fitted");
        Ok(())
    }

    fn predict(&self, query: &FeatureVector) -> KanjiResult<char> {
        let neighbors = self.neighbors(query)?;
        mode(neighbors.iter().map(|n| n.label))
            .ok_or_else(|| KanjiError::empty_candidates(self.name()))
    }

    fn weights(&self) -> FeatureWeights {
        self.config.weights
    }

    fn set_weights(&mut self, weights: FeatureWeights) -> KanjiResult<()> {
        weights.validate()?;
        self.config.weights = weights;
        Ok(())
    }

    fn tally(&self) -> &Tally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }
}
