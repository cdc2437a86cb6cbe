//! Greedy memoised search over feature weights.
//!
//! Starting from a base weight vector and its baseline score, each feature
//! family is raised by one step at a time and the classifier is re-scored.
//! A candidate whose score strictly beats its parent's is expanded further;
//! every weight vector is scored at most once per [`WeightSearch`], and the
//! best result seen is kept across invocations. The frontier is an explicit
//! stack bounded by evaluation and depth budgets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::StrokeClassifier;
use crate::error::{KanjiError, KanjiResult};
use crate::evaluation::score_weights;
use crate::features::{FeatureFamily, FeatureVector};
use crate::metric::FeatureWeights;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Amount added to one family per expansion
    pub step: f64,
    /// Families expanded from each improving candidate, in visiting order
    pub increment_order: Vec<FeatureFamily>,
    /// Classifier runs allowed per invocation
    pub max_evaluations: usize,
    /// Increments allowed along one path from the base
    pub max_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            increment_order: vec![
                FeatureFamily::Distances,
                FeatureFamily::Moves,
                FeatureFamily::Angles,
                FeatureFamily::Lengths,
                FeatureFamily::Strokes,
            ],
            max_evaluations: 500,
            max_depth: 64,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> KanjiResult<()> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(KanjiError::invalid_config(
                "search.step",
                self.step.to_string(),
                "must be finite and > 0",
            ));
        }
        if self.increment_order.is_empty() {
            return Err(KanjiError::invalid_config(
                "search.increment_order",
                "[]",
                "must name at least one feature family",
            ));
        }
        if self.max_evaluations == 0 {
            return Err(KanjiError::invalid_config(
                "search.max_evaluations",
                "0",
                "must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Result of one search invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub best_weights: FeatureWeights,
    pub best_score: usize,
    pub baseline: usize,
    /// Objective calls made by this invocation
    pub evaluations: usize,
    /// Candidates skipped because they were already scored
    pub memo_hits: usize,
    pub budget_exhausted: bool,
}

impl SearchOutcome {
    pub fn improved(&self) -> bool {
        self.best_score > self.baseline
    }
}

/// Exact bit pattern of each weight, in [`FeatureFamily::ALL`] order.
type WeightKey = [u64; 5];

fn key(weights: &FeatureWeights) -> WeightKey {
    weights.to_array().map(f64::to_bits)
}

struct Candidate {
    weights: FeatureWeights,
    parent_score: usize,
    depth: usize,
}

/// Memoised hill-climbing weight search.
#[derive(Debug, Clone)]
pub struct WeightSearch {
    config: SearchConfig,
    memo: HashMap<WeightKey, usize>,
    best: Option<(FeatureWeights, usize)>,
}

impl WeightSearch {
    pub fn new(config: SearchConfig) -> KanjiResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            memo: HashMap::new(),
            best: None,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of distinct weight vectors scored so far.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Score recorded for `weights`, if it was evaluated.
    pub fn score_of(&self, weights: &FeatureWeights) -> Option<usize> {
        self.memo.get(&key(weights)).copied()
    }

    pub fn best(&self) -> Option<(FeatureWeights, usize)> {
        self.best
    }

    /// Search outward from `base`, which is taken to score `baseline`.
    ///
    /// `evaluate` returns the number of correct classifications under the
    /// given weights. Its errors abort the search.
    pub fn search<F>(
        &mut self,
        base: FeatureWeights,
        baseline: usize,
        mut evaluate: F,
    ) -> KanjiResult<SearchOutcome>
    where
        F: FnMut(&FeatureWeights) -> KanjiResult<usize>,
    {
        base.validate()?;
        self.memo.entry(key(&base)).or_insert(baseline);
        self.consider(base, baseline);

        let mut stack = Vec::new();
        self.expand(&mut stack, &base, baseline, 1);

        let mut evaluations = 0;
        let mut memo_hits = 0;
        let mut budget_exhausted = false;

        while let Some(candidate) = stack.pop() {
            let candidate_key = key(&candidate.weights);
            if self.memo.contains_key(&candidate_key) {
                memo_hits += 1;
                continue;
            }
            if evaluations >= self.config.max_evaluations {
                warn!(
                    evaluations,
                    pending = stack.len() + 1,
                    "weight search evaluation budget exhausted"
                );
                budget_exhausted = true;
                break;
            }

            let score = evaluate(&candidate.weights)?;
            evaluations += 1;
            self.memo.insert(candidate_key, score);
            debug!(
                score,
                parent = candidate.parent_score,
                depth = candidate.depth,
                weights = ?candidate.weights,
                "scored weights"
            );

            if self.consider(candidate.weights, score) {
                info!(score, weights = ?candidate.weights, "new best weights");
            }
            if score > candidate.parent_score && candidate.depth < self.config.max_depth {
                self.expand(&mut stack, &candidate.weights, score, candidate.depth + 1);
            }
        }

        let (best_weights, best_score) = self.best.unwrap_or((base, baseline));
        Ok(SearchOutcome {
            best_weights,
            best_score,
            baseline,
            evaluations,
            memo_hits,
            budget_exhausted,
        })
    }

    /// Score `classifier` under its current weights on `test`, search from
    /// there, and leave the classifier set to the best weights found.
    pub fn tune<C>(
        &mut self,
        classifier: &mut C,
        test: &[KanjiResult<FeatureVector>],
    ) -> KanjiResult<SearchOutcome>
    where
        C: StrokeClassifier + ?Sized,
    {
        let base = classifier.weights();
        let baseline = score_weights(classifier, test, &base)?;
        let outcome = self.search(base, baseline, |weights| {
            score_weights(classifier, test, weights)
        })?;
        classifier.set_weights(outcome.best_weights)?;
        info!(
            classifier = classifier.name(),
            baseline = outcome.baseline,
            best = outcome.best_score,
            evaluations = outcome.evaluations,
            "weight search finished"
        );
        Ok(outcome)
    }

    fn consider(&mut self, weights: FeatureWeights, score: usize) -> bool {
        match self.best {
            Some((_, best)) if score <= best => false,
            _ => {
                self.best = Some((weights, score));
                true
            }
        }
    }

    fn expand(
        &self,
        stack: &mut Vec<Candidate>,
        weights: &FeatureWeights,
        score: usize,
        depth: usize,
    ) {
        // Reverse so the first family in the order is popped first.
        for &family in self.config.increment_order.iter().rev() {
            stack.push(Candidate {
                weights: weights.incremented(family, self.config.step),
                parent_score: score,
                depth,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig {
            step: 1.0,
            increment_order: vec![FeatureFamily::Distances, FeatureFamily::Moves],
            max_evaluations: 100,
            max_depth: 10,
        }
    }

    #[test]
    fn test_result_never_drops_below_baseline() {
        let mut search = WeightSearch::new(config()).unwrap();
        let outcome = search
            .search(FeatureWeights::UNIFORM, 7, |_| Ok(3))
            .unwrap();
        assert_eq!(outcome.best_score, 7);
        assert_eq!(outcome.best_weights, FeatureWeights::UNIFORM);
        assert_eq!(outcome.evaluations, 2);
        assert!(!outcome.improved());
    }

    #[test]
    fn test_climbs_while_scores_improve() {
        // Score rises with the distance weight up to 4, then falls.
        let mut search = WeightSearch::new(config()).unwrap();
        let base = FeatureWeights::new(1.0, 1.0, 0.0, 0.0, 0.0);
        let outcome = search
            .search(base, 0, |w| {
                let d = w.distances as i64;
                Ok((10 - (d - 4).abs() - w.moves as i64).max(0) as usize)
            })
            .unwrap();
        assert_eq!(outcome.best_score, 10);
        assert_eq!(outcome.best_weights.distances, 4.0);
        assert_eq!(outcome.best_weights.moves, 0.0);
        assert!(outcome.improved());
    }

    #[test]
    fn test_memo_prevents_rescoring() {
        let mut search = WeightSearch::new(config()).unwrap();
        let mut calls: HashMap<WeightKey, usize> = HashMap::new();
        let base = FeatureWeights::new(0.0, 0.0, 0.0, 0.0, 0.0);
        search
            .search(base, 0, |w| {
                *calls.entry(key(w)).or_insert(0) += 1;
                Ok((w.distances + w.moves) as usize)
            })
            .unwrap();
        assert!(calls.values().all(|&count| count == 1));
        assert!(search.memo_len() > 1);
    }

    #[test]
    fn test_repeated_search_is_idempotent() {
        let mut search = WeightSearch::new(config()).unwrap();
        let base = FeatureWeights::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let objective =
            |w: &FeatureWeights| Ok((w.distances.min(3.0) + w.moves.min(2.0)) as usize);

        let first = search.search(base, 0, objective).unwrap();
        let second = search.search(base, 0, objective).unwrap();
        assert_eq!(first.best_score, second.best_score);
        assert_eq!(first.best_weights, second.best_weights);
        assert_eq!(second.evaluations, 0);
        assert!(second.memo_hits > 0);
    }

    #[test]
    fn test_evaluation_budget_is_respected() {
        let mut search = WeightSearch::new(SearchConfig {
            max_evaluations: 5,
            ..config()
        })
        .unwrap();
        let base = FeatureWeights::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let outcome = search
            .search(base, 0, |w| Ok((w.distances + w.moves) as usize))
            .unwrap();
        assert_eq!(outcome.evaluations, 5);
        assert!(outcome.budget_exhausted);
    }

    #[test]
    fn test_depth_budget_is_respected() {
        let mut search = WeightSearch::new(SearchConfig {
            max_depth: 3,
            increment_order: vec![FeatureFamily::Lengths],
            ..config()
        })
        .unwrap();
        let base = FeatureWeights::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let outcome = search
            .search(base, 0, |w| Ok(w.lengths as usize))
            .unwrap();
        assert_eq!(outcome.best_weights.lengths, 3.0);
        assert_eq!(outcome.evaluations, 3);
    }

    #[test]
    fn test_objective_errors_abort() {
        let mut search = WeightSearch::new(config()).unwrap();
        let result = search.search(FeatureWeights::UNIFORM, 0, |_| {
            Err(KanjiError::empty_candidates("knn"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(WeightSearch::new(SearchConfig {
            step: 0.0,
            ..SearchConfig::default()
        })
        .is_err());
        assert!(WeightSearch::new(SearchConfig {
            increment_order: Vec::new(),
            ..SearchConfig::default()
        })
        .is_err());
    }
}
