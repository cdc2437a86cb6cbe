//! k-means partitioning under a weighted feature metric.
//!
//! Used by the cluster tree to split one node's members. Centroids are
//! seeded from randomly chosen members (or drawn inside the members' feature
//! ranges), members are assigned to the nearest centroid, and centroids are
//! recomputed as member means until assignments stop changing or the
//! iteration cap is hit. An emptied cluster is reseeded at random.

use rand::seq::index;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::distribution::running_mean;
use crate::features::{FeatureRanges, FeatureVector, FlatFeatures, StrokeFeatures};
use crate::metric::{first_minimum, DistanceMetric, FeatureWeights};

/// How initial and replacement centroids are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidSeeding {
    /// Copy the features of distinct random members
    #[default]
    Members,
    /// Draw every dimension uniformly within the members' observed range
    FeatureRanges,
}

/// Outcome of one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Non-empty clusters of positions into the partitioned slice
    pub clusters: Vec<Vec<usize>>,
    pub iterations: usize,
    pub converged: bool,
}

impl Partition {
    /// Fewer than two non-empty clusters means nothing was separated.
    pub fn is_degenerate(&self) -> bool {
        self.clusters.len() < 2
    }
}

pub struct KMeans<'a, M: ?Sized> {
    pub k: usize,
    pub max_iterations: usize,
    pub seeding: CentroidSeeding,
    pub metric: &'a M,
    pub weights: &'a FeatureWeights,
}

impl<'a, M: DistanceMetric + ?Sized> KMeans<'a, M> {
    pub fn partition<R: Rng + ?Sized>(
        &self,
        members: &[&FeatureVector],
        rng: &mut R,
    ) -> Partition {
        let n = members.len();
        if n == 0 {
            return Partition {
                clusters: Vec::new(),
                iterations: 0,
                converged: true,
            };
        }
        let k = self.k.clamp(1, n);
        let ranges = match self.seeding {
            CentroidSeeding::FeatureRanges => FeatureRanges::observe(members.iter().copied()),
            CentroidSeeding::Members => None,
        };

        let mut centroids: Vec<StrokeFeatures> = match &ranges {
            Some(ranges) => (0..k).map(|_| ranges.sample(rng)).collect(),
            None => index::sample(rng, n, k)
                .into_iter()
                .map(|i| *members[i].features())
                .collect(),
        };

        let mut assignments: Vec<usize> = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations.max(1) {
            iterations += 1;
            let next: Vec<usize> = members
                .par_iter()
                .map(|member| self.nearest(&centroids, member))
                .collect();
            if next == assignments {
                converged = true;
                break;
            }
            assignments = next;

            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                let assigned: Vec<FlatFeatures> = members
                    .iter()
                    .zip(&assignments)
                    .filter(|&(_, &a)| a == cluster)
                    .map(|(member, _)| member.features().to_flat())
                    .collect();
                *centroid = if assigned.is_empty() {
                    trace!(cluster, "reseeding empty cluster");
                    match &ranges {
                        Some(ranges) => ranges.sample(rng),
                        None => *members[rng.gen_range(0..n)].features(),
                    }
                } else {
                    StrokeFeatures::from_flat(&running_mean(&assigned))
                };
            }
        }

        let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (position, &cluster) in assignments.iter().enumerate() {
            clusters[cluster].push(position);
        }
        clusters.retain(|members| !members.is_empty());

        Partition {
            clusters,
            iterations,
            converged,
        }
    }

    fn nearest(&self, centroids: &[StrokeFeatures], member: &FeatureVector) -> usize {
        let scores: Vec<f64> = centroids
            .iter()
            .map(|centroid| self.metric.between(centroid, member.features(), self.weights))
            .collect();
        first_minimum(&scores).unwrap_or(0)
    }
}
