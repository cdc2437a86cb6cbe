//! Batch evaluation of classifiers against held-out samples.
//!
//! Test samples arrive as decode results so a malformed sample is counted
//! and skipped without aborting the run. Classification against an empty
//! training set aborts it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{StrokeClassifier, Tally};
use crate::error::KanjiResult;
use crate::features::FeatureVector;
use crate::logging;
use crate::metric::FeatureWeights;
use crate::optimizer::{SearchOutcome, WeightSearch};

/// Outcome of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub classifier: String,
    pub weights: FeatureWeights,
    pub tally: Tally,
    pub elapsed_ms: u128,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f32 {
        self.tally.accuracy()
    }
}

/// Classify every test sample, accumulating into the classifier's tallies.
pub fn evaluate<C>(
    classifier: &mut C,
    test: &[KanjiResult<FeatureVector>],
) -> KanjiResult<EvaluationReport>
where
    C: StrokeClassifier + ?Sized,
{
    let start = Instant::now();
    for (index, sample) in test.iter().enumerate() {
        let vector = match sample {
            Ok(vector) => vector,
            Err(err) => {
                warn!(index, %err, "skipping malformed test sample");
                classifier.record_skipped(None);
                continue;
            }
        };

        let mut query = vector.clone();
        if let Err(err) = classifier.classify(&mut query) {
            if err.is_fatal() {
                return Err(err);
            }
            warn!(index, %err, "skipping unclassifiable test sample");
            classifier.record_skipped(vector.label());
        }
    }

    Ok(EvaluationReport {
        classifier: classifier.name().to_string(),
        weights: classifier.weights(),
        tally: classifier.tally().clone(),
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Correct classifications of `test` under `weights`, starting from a clean tally.
pub fn score_weights<C>(
    classifier: &mut C,
    test: &[KanjiResult<FeatureVector>],
    weights: &FeatureWeights,
) -> KanjiResult<usize>
where
    C: StrokeClassifier + ?Sized,
{
    classifier.set_weights(*weights)?;
    classifier.tally_mut().reset();
    Ok(evaluate(classifier, test)?.tally.correct)
}

/// Fixed training and test sets shared by several classifiers.
#[derive(Debug, Clone)]
pub struct EvaluationHarness {
    training: Vec<FeatureVector>,
    test: Vec<KanjiResult<FeatureVector>>,
    log_dir: Option<PathBuf>,
}

impl EvaluationHarness {
    pub fn new(training: Vec<FeatureVector>, test: Vec<KanjiResult<FeatureVector>>) -> Self {
        Self {
            training,
            test,
            log_dir: None,
        }
    }

    /// Append JSON-lines records of every run under `dir`.
    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.log_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn training(&self) -> &[FeatureVector] {
        &self.training
    }

    pub fn test(&self) -> &[KanjiResult<FeatureVector>] {
        &self.test
    }

    /// Fit on the training set and evaluate on the test set.
    pub fn run<C>(&self, classifier: &mut C) -> KanjiResult<EvaluationReport>
    where
        C: StrokeClassifier + ?Sized,
    {
        classifier.fit(&self.training)?;
        let report = evaluate(classifier, &self.test)?;
        info!(
            classifier = %report.classifier,
            correct = report.tally.correct,
            incorrect = report.tally.incorrect,
            skipped = report.tally.skipped,
            "evaluation finished"
        );
        if let Some(dir) = &self.log_dir {
            if let Err(err) = logging::log_evaluation(dir, &report) {
                warn!(%err, "failed to write evaluation log");
            }
        }
        Ok(report)
    }

    /// Fit, then search weights against the test set.
    pub fn tune<C>(
        &self,
        classifier: &mut C,
        search: &mut WeightSearch,
    ) -> KanjiResult<SearchOutcome>
    where
        C: StrokeClassifier + ?Sized,
    {
        classifier.fit(&self.training)?;
        let outcome = search.tune(classifier, &self.test)?;
        if let Some(dir) = &self.log_dir {
            if let Err(err) = logging::log_search(dir, classifier.name(), &outcome) {
                warn!(%err, "failed to write weight search log");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{KnnConfig, NearestNeighbor};
    use crate::error::KanjiError;
    use crate::features::StrokeFeatures;

    fn sample(label: char, length: f64) -> FeatureVector {
        let mut features = StrokeFeatures::default();
        features.lengths[0] = length;
        features.strokes = 1.0;
        FeatureVector::from_features(label, features)
    }

    fn knn() -> NearestNeighbor {
        NearestNeighbor::new(KnnConfig {
            k: 1,
            weights: FeatureWeights::new(1.0, 0.0, 0.0, 0.0, 0.0),
        })
        .unwrap()
    }

    #[test]
    fn test_malformed_samples_are_skipped() {
        let harness = EvaluationHarness::new(
            vec![sample('a', 10.0), sample('b', 100.0)],
            vec![
                Ok(sample('a', 12.0)),
                Err(KanjiError::decode("odd number of coordinates")),
                Ok(sample('b', 90.0)),
            ],
        );
        let mut classifier = knn();
        let report = harness.run(&mut classifier).unwrap();
        assert_eq!(report.tally.correct, 2);
        assert_eq!(report.tally.skipped, 1);
        assert_eq!(report.tally.incorrect, 1);
        assert_eq!(report.classifier, "knn");
    }

    #[test]
    fn test_empty_training_aborts() {
        let mut classifier = knn();
        let err = evaluate(&mut classifier, &[Ok(sample('a', 1.0))]).unwrap_err();
        assert!(matches!(err, KanjiError::EmptyCandidateSet { .. }));
    }

    #[test]
    fn test_score_weights_resets_tally() {
        let mut classifier = knn();
        classifier
            .fit(&[sample('a', 10.0), sample('b', 100.0)])
            .unwrap();
        let test = vec![Ok(sample('a', 11.0)), Ok(sample('b', 99.0))];
        let weights = classifier.weights();
        assert_eq!(score_weights(&mut classifier, &test, &weights).unwrap(), 2);
        assert_eq!(score_weights(&mut classifier, &test, &weights).unwrap(), 2);
        assert_eq!(classifier.tally().total(), 2);
    }

    #[test]
    fn test_harness_writes_logs() {
        let dir = std::env::temp_dir().join(format!("kanji-eval-{}", std::process::id()));
        let harness = EvaluationHarness::new(
            vec![sample('a', 10.0), sample('b', 100.0)],
            vec![Ok(sample('a', 12.0))],
        )
        .with_log_dir(&dir);
        harness.run(&mut knn()).unwrap();
        let written = std::fs::read_to_string(dir.join("evaluation.jsonl")).unwrap();
        assert!(written.contains("\"classifier\":\"knn\""));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
