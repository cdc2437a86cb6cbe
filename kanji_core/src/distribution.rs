//! Per-label feature distributions.
//!
//! Each label's training tokens are summarised by a running mean and a
//! sample standard deviation (N - 1 denominator) over every feature
//! dimension. The model is rebuilt from scratch whenever training data
//! changes and never updated incrementally.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{KanjiError, KanjiResult};
use crate::features::{
    FeatureFamily, FeatureVector, FlatFeatures, StrokeFeatures, FEATURE_DIMENSIONS,
};
use crate::metric::{DistanceMetric, FeatureWeights};

/// Mean and spread of one label's training tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelDistribution {
    label: char,
    tokens: usize,
    mean: StrokeFeatures,
    deviation: StrokeFeatures,
}

impl LabelDistribution {
    /// Summarise `tokens`. A single token yields a zero deviation.
    pub fn from_tokens(label: char, tokens: &[&FeatureVector]) -> KanjiResult<Self> {
        if tokens.is_empty() {
            return Err(KanjiError::degenerate_distribution(label, 0));
        }
        let flats: Vec<FlatFeatures> = tokens.iter().map(|t| t.features().to_flat()).collect();
        let mean = running_mean(&flats);
        let deviation = sample_deviation(label, &flats, &mean).unwrap_or_else(|err| {
            debug!(%err, "using zero deviation");
            [0.0; FEATURE_DIMENSIONS]
        });

        Ok(Self {
            label,
            tokens: tokens.len(),
            mean: StrokeFeatures::from_flat(&mean),
            deviation: StrokeFeatures::from_flat(&deviation),
        })
    }

    pub fn label(&self) -> char {
        self.label
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn mean(&self) -> &StrokeFeatures {
        &self.mean
    }

    pub fn deviation(&self) -> &StrokeFeatures {
        &self.deviation
    }

    /// The label aggregate: mean features with averages and deviations attached.
    pub fn representative(&self) -> FeatureVector {
        FeatureVector::aggregate(self.label, self.mean, Some(self.deviation))
    }

    /// Weighted sum of `|query - mean| / (deviation + 1)` per family.
    pub fn z_score(&self, query: &FeatureVector, weights: &FeatureWeights) -> f64 {
        let value = query.features().to_flat();
        let mean = self.mean.to_flat();
        let deviation = self.deviation.to_flat();
        FeatureFamily::ALL
            .iter()
            .map(|&family| {
                let weight = weights.get(family);
                if weight == 0.0 {
                    return 0.0;
                }
                let sum: f64 = family
                    .range()
                    .map(|i| (value[i] - mean[i]).abs() / (deviation[i] + 1.0))
                    .sum();
                weight * sum
            })
            .sum()
    }

    /// Weighted distance from the label mean to `query`.
    pub fn raw_distance<M: DistanceMetric + ?Sized>(
        &self,
        metric: &M,
        query: &FeatureVector,
        weights: &FeatureWeights,
    ) -> f64 {
        metric.between(&self.mean, query.features(), weights)
    }
}

/// Distributions for every training label, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionModel {
    labels: Vec<LabelDistribution>,
}

impl DistributionModel {
    pub fn build(training: &[FeatureVector]) -> KanjiResult<Self> {
        let labels = group_by_label(training)?
            .into_iter()
            .map(|(label, tokens)| LabelDistribution::from_tokens(label, &tokens))
            .collect::<KanjiResult<Vec<_>>>()?;
        debug!(labels = labels.len(), samples = training.len(), "built distribution model");
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[LabelDistribution] {
        &self.labels
    }

    pub fn get(&self, label: char) -> Option<&LabelDistribution> {
        self.labels.iter().find(|d| d.label == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Group training samples by label, preserving first-seen label order.
pub(crate) fn group_by_label(
    training: &[FeatureVector],
) -> KanjiResult<Vec<(char, Vec<&FeatureVector>)>> {
    let mut index: HashMap<char, usize> = HashMap::new();
    let mut groups: Vec<(char, Vec<&FeatureVector>)> = Vec::new();
    for (position, sample) in training.iter().enumerate() {
        let label = sample
            .label()
            .ok_or_else(|| KanjiError::missing_label(format!("training sample {}", position)))?;
        let slot = *index.entry(label).or_insert_with(|| {
            groups.push((label, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(sample);
    }
    Ok(groups)
}

/// Incremental mean `((mean * n) + x) / (n + 1)` over each dimension.
pub(crate) fn running_mean(flats: &[FlatFeatures]) -> FlatFeatures {
    let mut mean = [0.0; FEATURE_DIMENSIONS];
    for (n, flat) in flats.iter().enumerate() {
        let n = n as f64;
        for (m, x) in mean.iter_mut().zip(flat) {
            *m = (*m * n + x) / (n + 1.0);
        }
    }
    mean
}

/// Sample standard deviation with an `N - 1` denominator.
pub(crate) fn sample_deviation(
    label: char,
    flats: &[FlatFeatures],
    mean: &FlatFeatures,
) -> KanjiResult<FlatFeatures> {
    if flats.len() < 2 {
        return Err(KanjiError::degenerate_distribution(label, flats.len()));
    }
    let mut deviation = [0.0; FEATURE_DIMENSIONS];
    for flat in flats {
        for ((d, x), m) in deviation.iter_mut().zip(flat).zip(mean) {
            *d += (x - m) * (x - m);
        }
    }
    let denominator = (flats.len() - 1) as f64;
    for d in deviation.iter_mut() {
        *d = (*d / denominator).sqrt();
    }
    Ok(deviation)
}
