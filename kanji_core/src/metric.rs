//! Weighted distance between feature vectors.
//!
//! The reference side of every comparison contributes its averaged features
//! when it is a label aggregate and its raw features otherwise; the query
//! always contributes raw features. Each family's absolute differences are
//! summed and scaled by that family's weight. A zero weight disables the
//! family entirely.

use serde::{Deserialize, Serialize};

use crate::error::{KanjiError, KanjiResult};
use crate::features::{FeatureFamily, FeatureVector, StrokeFeatures};

/// Per-family multipliers applied by the distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub lengths: f64,
    pub angles: f64,
    pub distances: f64,
    pub moves: f64,
    pub strokes: f64,
}

impl FeatureWeights {
    /// Centroid-offset only profile used by the plain nearest-neighbor search.
    pub const DISTANCES_ONLY: Self = Self::new(0.0, 0.0, 1.0, 0.0, 0.0);
    /// Profile favouring stroke placement over raw geometry.
    pub const PLACEMENT: Self = Self::new(1.0, 1.0, 12.0, 3.0, 0.0);
    /// Profile used to grow and descend the cluster tree.
    pub const CLUSTERING: Self = Self::new(1.0, 1.0, 3.0, 3.0, 10.0);
    /// Every stroke family at unit weight, stroke count ignored.
    pub const UNIFORM: Self = Self::new(1.0, 1.0, 1.0, 1.0, 0.0);

    pub const fn new(lengths: f64, angles: f64, distances: f64, moves: f64, strokes: f64) -> Self {
        Self {
            lengths,
            angles,
            distances,
            moves,
            strokes,
        }
    }

    pub fn get(&self, family: FeatureFamily) -> f64 {
        match family {
            FeatureFamily::Lengths => self.lengths,
            FeatureFamily::Angles => self.angles,
            FeatureFamily::Distances => self.distances,
            FeatureFamily::Moves => self.moves,
            FeatureFamily::Strokes => self.strokes,
        }
    }

    pub fn get_mut(&mut self, family: FeatureFamily) -> &mut f64 {
        match family {
            FeatureFamily::Lengths => &mut self.lengths,
            FeatureFamily::Angles => &mut self.angles,
            FeatureFamily::Distances => &mut self.distances,
            FeatureFamily::Moves => &mut self.moves,
            FeatureFamily::Strokes => &mut self.strokes,
        }
    }

    /// Copy with one family raised by `step`.
    pub fn incremented(mut self, family: FeatureFamily, step: f64) -> Self {
        *self.get_mut(family) += step;
        self
    }

    /// Weights as an array in [`FeatureFamily::ALL`] order.
    pub fn to_array(&self) -> [f64; 5] {
        FeatureFamily::ALL.map(|family| self.get(family))
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> KanjiResult<()> {
        for family in FeatureFamily::ALL {
            let value = self.get(family);
            if !value.is_finite() || value < 0.0 {
                return Err(KanjiError::invalid_config(
                    format!("weights.{}", family),
                    value.to_string(),
                    "must be finite and >= 0",
                ));
            }
        }
        Ok(())
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::UNIFORM
    }
}

/// Dissimilarity between a reference and a query.
///
/// Implementations must be pure so classifiers can evaluate candidates in
/// parallel.
pub trait DistanceMetric: Send + Sync {
    fn between(
        &self,
        reference: &StrokeFeatures,
        query: &StrokeFeatures,
        weights: &FeatureWeights,
    ) -> f64;

    fn distance(
        &self,
        reference: &FeatureVector,
        query: &FeatureVector,
        weights: &FeatureWeights,
    ) -> f64 {
        self.between(reference.reference_features(), query.features(), weights)
    }
}

/// Weighted sum of per-family absolute differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedManhattan;

impl DistanceMetric for WeightedManhattan {
    fn between(
        &self,
        reference: &StrokeFeatures,
        query: &StrokeFeatures,
        weights: &FeatureWeights,
    ) -> f64 {
        let reference = reference.to_flat();
        let query = query.to_flat();
        FeatureFamily::ALL
            .iter()
            .map(|&family| {
                let weight = weights.get(family);
                if weight == 0.0 {
                    return 0.0;
                }
                let sum: f64 = family
                    .range()
                    .map(|i| (reference[i] - query[i]).abs())
                    .sum();
                weight * sum
            })
            .sum()
    }
}

/// Weighted Manhattan distance between two vectors.
pub fn distance(
    reference: &FeatureVector,
    query: &FeatureVector,
    weights: &FeatureWeights,
) -> f64 {
    WeightedManhattan.distance(reference, query, weights)
}

/// Index of the first strictly smallest score. NaN scores never win, and
/// `None` means nothing beat the `f64::INFINITY` sentinel.
pub fn first_minimum(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut min = f64::INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score < min {
            min = score;
            best = Some(i);
        }
    }
    best
}
