//! Classifiers over pixel grids.

use rayon::prelude::*;

use super::{PixelDistribution, PixelKanji};
use crate::classifier::{mode, Tally};
use crate::error::{KanjiError, KanjiResult};
use crate::metric::first_minimum;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPrediction {
    pub by_z_score: char,
    pub by_distance: char,
}

/// Per-label pixel distributions scored by z-score and mean distance.
#[derive(Debug, Clone, Default)]
pub struct PixelGaussian {
    distributions: Vec<PixelDistribution>,
    z_score_tally: Tally,
    distance_tally: Tally,
}

impl PixelGaussian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every label distribution from `training`.
    pub fn fit(&mut self, training: &[PixelKanji]) -> KanjiResult<()> {
        let mut groups: Vec<(char, Vec<&PixelKanji>)> = Vec::new();
        for (position, sample) in training.iter().enumerate() {
            let label = sample.label().ok_or_else(|| {
                KanjiError::missing_label(format!("pixel training sample {}", position))
            })?;
            match groups.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, tokens)) => tokens.push(sample),
                None => groups.push((label, vec![sample])),
            }
        }
        self.distributions = groups
            .iter()
            .map(|(label, tokens)| PixelDistribution::build(*label, tokens))
            .collect::<KanjiResult<Vec<_>>>()?;
        Ok(())
    }

    pub fn distributions(&self) -> &[PixelDistribution] {
        &self.distributions
    }

    pub fn z_score_tally(&self) -> &Tally {
        &self.z_score_tally
    }

    pub fn distance_tally(&self) -> &Tally {
        &self.distance_tally
    }

    pub fn predict(&self, query: &PixelKanji) -> KanjiResult<PixelPrediction> {
        if self.distributions.is_empty() {
            return Err(KanjiError::empty_candidates("pixel-gaussian"));
        }
        let scores = self
            .distributions
            .par_iter()
            .map(|dist| Ok((dist.z_score(query)?, dist.distance(query)?)))
            .collect::<KanjiResult<Vec<(f64, f64)>>>()?;
        let (z_scores, distances): (Vec<f64>, Vec<f64>) = scores.into_iter().unzip();
        let z = first_minimum(&z_scores).unwrap_or(0);
        let d = first_minimum(&distances).unwrap_or(0);
        Ok(PixelPrediction {
            by_z_score: self.distributions[z].label(),
            by_distance: self.distributions[d].label(),
        })
    }

    /// Predict, tally both methods, and label the query by z-score.
    pub fn classify(&mut self, query: &mut PixelKanji) -> KanjiResult<PixelPrediction> {
        let prediction = self.predict(query)?;
        if let Some(actual) = query.label() {
            self.z_score_tally.record(actual, prediction.by_z_score);
            self.distance_tally.record(actual, prediction.by_distance);
        }
        query.assign_label(prediction.by_z_score);
        Ok(prediction)
    }
}

/// k-nearest-neighbor vote by summed absolute pixel difference.
#[derive(Debug, Clone)]
pub struct PixelNearestNeighbor {
    k: usize,
    candidates: Vec<PixelKanji>,
    tally: Tally,
}

impl PixelNearestNeighbor {
    pub fn new(k: usize) -> KanjiResult<Self> {
        if k == 0 {
            return Err(KanjiError::invalid_config("pixel_knn.k", "0", "must be >= 1"));
        }
        Ok(Self {
            k,
            candidates: Vec::new(),
            tally: Tally::default(),
        })
    }

    pub fn train(&mut self, sample: PixelKanji) -> KanjiResult<()> {
        if sample.label().is_none() {
            return Err(KanjiError::missing_label("pixel knn training sample"));
        }
        self.candidates.push(sample);
        Ok(())
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn predict(&self, query: &PixelKanji) -> KanjiResult<char> {
        if self.candidates.is_empty() {
            return Err(KanjiError::empty_candidates("pixel-knn"));
        }
        let distances = self
            .candidates
            .par_iter()
            .map(|candidate| candidate.distance(query))
            .collect::<KanjiResult<Vec<f64>>>()?;
        let mut order: Vec<usize> = (0..distances.len()).collect();
        order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        mode(
            order
                .into_iter()
                .take(self.k)
                .filter_map(|i| self.candidates[i].label()),
        )
        .ok_or_else(|| KanjiError::empty_candidates("pixel-knn"))
    }

    pub fn classify(&mut self, query: &mut PixelKanji) -> KanjiResult<char> {
        let predicted = self.predict(query)?;
        if let Some(actual) = query.label() {
            self.tally.record(actual, predicted);
        }
        query.assign_label(predicted);
        Ok(predicted)
    }
}
