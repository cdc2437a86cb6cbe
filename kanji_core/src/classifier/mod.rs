//! Stroke-feature classifiers.
//!
//! Three strategies share the [`StrokeClassifier`] trait:
//! - [`NearestNeighbor`]: k-nearest-neighbor vote over every training sample
//! - [`GaussianClassifier`]: per-label z-score and mean-distance scoring
//! - [`ClusterTree`]: divisive k-means hierarchy descended greedily
//!
//! Every classifier keeps a running [`Tally`] of its predictions against the
//! true labels of the queries it was asked to classify.

pub mod gaussian;
pub mod kmeans;
pub mod knn;
pub mod tree;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::KanjiResult;
use crate::features::FeatureVector;
use crate::metric::FeatureWeights;

pub use gaussian::{GaussianClassifier, GaussianConfig, GaussianPrediction, GaussianScoring};
pub use kmeans::{CentroidSeeding, KMeans, Partition};
pub use knn::{KnnConfig, NearestNeighbor, Neighbor};
pub use tree::{
    ClusterConvergenceWarning, ClusterNode, ClusterTree, ConvergenceIssue, NodeId, TreeConfig,
    TreeSummary,
};

/// Common interface over the stroke-feature classifiers.
pub trait StrokeClassifier {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Replace all training data and rebuild derived models
    fn fit(&mut self, training: &[FeatureVector]) -> KanjiResult<()>;

    /// Predict a label without recording anything
    fn predict(&self, query: &FeatureVector) -> KanjiResult<char>;

    /// Current feature weights
    fn weights(&self) -> FeatureWeights;

    /// Replace feature weights, rebuilding any weight-dependent structure
    fn set_weights(&mut self, weights: FeatureWeights) -> KanjiResult<()>;

    fn tally(&self) -> &Tally;

    fn tally_mut(&mut self) -> &mut Tally;

    /// Predict, record the outcome against the query's true label, then
    /// overwrite the query label with the prediction.
    fn classify(&mut self, query: &mut FeatureVector) -> KanjiResult<char> {
        let predicted = self.predict(query)?;
        if let Some(actual) = query.label() {
            self.tally_mut().record(actual, predicted);
        }
        query.assign_label(predicted);
        Ok(predicted)
    }

    /// Count a query that could not be classified
    fn record_skipped(&mut self, actual: Option<char>) {
        self.tally_mut().record_skipped(actual);
    }
}

/// Correct and incorrect counts for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTally {
    pub correct: usize,
    pub incorrect: usize,
}

impl LabelTally {
    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }
}

/// Running prediction counters with a per-label breakdown.
///
/// Skipped queries count as incorrect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub per_label: BTreeMap<char, LabelTally>,
}

impl Tally {
    /// Record one prediction; returns whether it was correct.
    pub fn record(&mut self, actual: char, predicted: char) -> bool {
        let hit = actual == predicted;
        let entry = self.per_label.entry(actual).or_default();
        if hit {
            self.correct += 1;
            entry.correct += 1;
        } else {
            self.incorrect += 1;
            entry.incorrect += 1;
        }
        hit
    }

    pub fn record_skipped(&mut self, actual: Option<char>) {
        self.skipped += 1;
        self.incorrect += 1;
        if let Some(label) = actual {
            self.per_label.entry(label).or_default().incorrect += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }

    /// Fraction of recorded queries predicted correctly; zero when empty.
    pub fn accuracy(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.correct as f32 / total as f32,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Most frequent label; ties resolve to the label seen first.
pub(crate) fn mode<I>(labels: I) -> Option<char>
where
    I: IntoIterator<Item = char>,
{
    let mut counts: Vec<(char, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    let mut best: Option<(char, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}
