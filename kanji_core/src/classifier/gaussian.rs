//! Gaussian-style classification against per-label distributions.
//!
//! Each query is scored against every label two ways: a z-score (absolute
//! deviation from the label mean, normalised by the label's spread) and a
//! raw weighted distance to the label mean. Both predictions are tallied
//! independently; [`GaussianScoring`] picks which one `predict` returns.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{StrokeClassifier, Tally};
use crate::distribution::DistributionModel;
use crate::error::{KanjiError, KanjiResult};
use crate::features::FeatureVector;
use crate::metric::{first_minimum, DistanceMetric, FeatureWeights, WeightedManhattan};

/// Which score [`GaussianClassifier::predict`] reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussianScoring {
    #[default]
    ZScore,
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianConfig {
    pub weights: FeatureWeights,
    pub scoring: GaussianScoring,
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            weights: FeatureWeights::PLACEMENT,
            scoring: GaussianScoring::ZScore,
        }
    }
}

impl GaussianConfig {
    pub fn validate(&self) -> KanjiResult<()> {
        self.weights.validate()
    }
}

/// Best label under each scoring method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPrediction {
    pub by_z_score: char,
    pub z_score: f64,
    pub by_distance: char,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct GaussianClassifier<M = WeightedManhattan> {
    config: GaussianConfig,
    metric: M,
    model: DistributionModel,
    z_score_tally: Tally,
    distance_tally: Tally,
}

impl GaussianClassifier<WeightedManhattan> {
    pub fn new(config: GaussianConfig) -> KanjiResult<Self> {
        Self::with_metric(config, WeightedManhattan)
    }
}

impl<M: DistanceMetric> GaussianClassifier<M> {
    pub fn with_metric(config: GaussianConfig, metric: M) -> KanjiResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metric,
            model: DistributionModel::default(),
            z_score_tally: Tally::default(),
            distance_tally: Tally::default(),
        })
    }

    pub fn config(&self) -> &GaussianConfig {
        &self.config
    }

    pub fn model(&self) -> &DistributionModel {
        &self.model
    }

    pub fn z_score_tally(&self) -> &Tally {
        &self.z_score_tally
    }

    pub fn distance_tally(&self) -> &Tally {
        &self.distance_tally
    }

    /// Score `query` against every label; ties go to the label seen first.
    pub fn score(&self, query: &FeatureVector) -> KanjiResult<GaussianPrediction> {
        let labels = self.model.labels();
        if labels.is_empty() {
            return Err(KanjiError::empty_candidates(self.name()));
        }

        let weights = self.config.weights;
        let scores: Vec<(f64, f64)> = labels
            .par_iter()
            .map(|dist| {
                (
                    dist.z_score(query, &weights),
                    dist.raw_distance(&self.metric, query, &weights),
                )
            })
            .collect();
        let (z_scores, distances): (Vec<f64>, Vec<f64>) = scores.into_iter().unzip();

        // Non-finite scores everywhere fall back to the first label.
        let z = first_minimum(&z_scores).unwrap_or(0);
        let d = first_minimum(&distances).unwrap_or(0);
        Ok(GaussianPrediction {
            by_z_score: labels[z].label(),
            z_score: z_scores[z],
            by_distance: labels[d].label(),
            distance: distances[d],
        })
    }
}

impl<M: DistanceMetric> StrokeClassifier for GaussianClassifier<M> {
    fn name(&self) -> &'static str {
        match self.config.scoring {
            GaussianScoring::ZScore => "gaussian-zscore",
            GaussianScoring::Distance => "gaussian-distance",
        }
    }

    fn fit(&mut self, training: &[FeatureVector]) -> KanjiResult<()> {
        self.model = DistributionModel::build(training)?;
        Ok(())
    }

    fn predict(&self, query: &FeatureVector) -> KanjiResult<char> {
        let prediction = self.score(query)?;
        Ok(match self.config.scoring {
            GaussianScoring::ZScore => prediction.by_z_score,
            GaussianScoring::Distance => prediction.by_distance,
        })
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
        match self.config.scoring {
            GaussianScoring::ZScore => &self.z_score_tally,
            GaussianScoring::Distance => &self.distance_tally,
        }
    }

    fn tally_mut(&mut self) -> &mut Tally {
        match self.config.scoring {
            GaussianScoring::ZScore => &mut self.z_score_tally,
            GaussianScoring::Distance => &mut self.distance_tally,
        }
    }

    fn classify(&mut self, query: &mut FeatureVector) -> KanjiResult<char> {
        let prediction = self.score(query)?;
        if let Some(actual) = query.label() {
            self.z_score_tally.record(actual, prediction.by_z_score);
            self.distance_tally.record(actual, prediction.by_distance);
        }
        let predicted = match self.config.scoring {
            GaussianScoring::ZScore => prediction.by_z_score,
            GaussianScoring::Distance => prediction.by_distance,
        };
        query.assign_label(predicted);
        Ok(predicted)
    }

    fn record_skipped(&mut self, actual: Option<char>) {
        self.z_score_tally.record_skipped(actual);
        self.distance_tally.record_skipped(actual);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::StrokeFeatures;

    fn sample(label: char, length: f64, angle: f64) -> FeatureVector {
        let mut features = StrokeFeatures::default();
        features.lengths[0] = length;
        features.angles[0] = angle;
        features.strokes = 1.0;
        FeatureVector::from_features(label, features)
    }

    #[test]
    fn test_unfitted_classifier_errors() {
        let gaussian = GaussianClassifier::new(GaussianConfig::default()).unwrap();
        let err = gaussian.predict(&sample('a', 1.0, 0.0)).unwrap_err();
        assert!(matches!(err, KanjiError::EmptyCandidateSet { .. }));
    }

    #[test]
    fn test_z_score_accounts_for_spread() {
        // 'w' is wide in length, 'n' is narrow; the query sits closer to the
        // narrow mean in raw units but well inside the wide spread.
        let training = vec![
            sample('w', 0.0, 0.0),
            sample('w', 100.0, 0.0),
            sample('n', 70.0, 0.0),
            sample('n', 70.0, 0.0),
        ];
        let mut gaussian = GaussianClassifier::new(GaussianConfig {
            weights: FeatureWeights::new(1.0, 0.0, 0.0, 0.0, 0.0),
            scoring: GaussianScoring::ZScore,
        })
        .unwrap();
        gaussian.fit(&training).unwrap();

        let prediction = gaussian.score(&sample('?', 55.0, 0.0)).unwrap();
        assert_eq!(prediction.by_distance, 'w');
        assert_eq!(prediction.by_z_score, 'w');

        let prediction = gaussian.score(&sample('?', 64.0, 0.0)).unwrap();
        assert_eq!(prediction.by_distance, 'n');
        assert_eq!(prediction.by_z_score, 'w');
    }

    #[test]
    fn test_classify_tallies_both_methods() {
        let training = vec![
            sample('w', 0.0, 0.0),
            sample('w', 100.0, 0.0),
            sample('n', 70.0, 0.0),
            sample('n', 70.0, 0.0),
        ];
        let mut gaussian = GaussianClassifier::new(GaussianConfig {
            weights: FeatureWeights::new(1.0, 0.0, 0.0, 0.0, 0.0),
            scoring: GaussianScoring::Distance,
        })
        .unwrap();
        gaussian.fit(&training).unwrap();

        let mut query = sample('w', 64.0, 0.0);
        assert_eq!(gaussian.classify(&mut query).unwrap(), 'n');
        assert_eq!(query.label(), Some('n'));
        assert_eq!(gaussian.z_score_tally().correct, 1);
        assert_eq!(gaussian.distance_tally().incorrect, 1);
        assert_eq!(gaussian.tally().incorrect, 1);
    }

    #[test]
    fn single_label_training_always_predicts_it() {
        let training = vec![
            sample('A', 10.0, 0.0),
            sample('A', 14.0, 3.0),
            sample('A', 9.0, -2.0),
        ];
        let queries = [
            sample('?', 12.0, 1.0),
            sample('?', f64::MAX, f64::MAX),
            sample('?', -f64::MAX, 0.0),
            sample('?', 0.0, 0.0),
        ];
        for scoring in [GaussianScoring::ZScore, GaussianScoring::Distance] {
            let mut gaussian = GaussianClassifier::new(GaussianConfig {
                scoring,
                ..GaussianConfig::default()
            })
            .unwrap();
            gaussian.fit(&training).unwrap();
            for query in &queries {
                let prediction = gaussian.score(query).unwrap();
                assert_eq!(prediction.by_z_score, 'A');
                assert_eq!(prediction.by_distance, 'A');
                assert_eq!(gaussian.predict(query).unwrap(), 'A');
            }
        }
    }

    #[test]
    fn test_single_token_label_still_scores() {
        let training = vec![sample('a', 10.0, 0.0), sample('b', 300.0, 90.0)];
        let mut gaussian = GaussianClassifier::new(GaussianConfig::default()).unwrap();
        gaussian.fit(&training).unwrap();
        assert_eq!(gaussian.predict(&sample('?', 12.0, 5.0)).unwrap(), 'a');
        assert_eq!(gaussian.predict(&sample('?', 280.0, 80.0)).unwrap(), 'b');
    }
}
