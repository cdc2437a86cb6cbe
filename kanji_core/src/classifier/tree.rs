//! Divisive clustering tree.
//!
//! The tree is grown breadth-first from a root holding every training
//! sample. A node whose members all share one label stays a leaf; any other
//! node is split by k-means into child clusters. Classification descends from
//! the root, always following the child whose representative is nearest to
//! the query, and reports the label of the node where descent stops.
//!
//! Nodes live in an arena addressed by [`NodeId`]; children hold no back
//! references beyond their parent id.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::kmeans::{CentroidSeeding, KMeans, Partition};
use super::{StrokeClassifier, Tally};
use crate::distribution::running_mean;
use crate::error::{KanjiError, KanjiResult};
use crate::features::{FeatureVector, FlatFeatures, StrokeFeatures};
use crate::metric::{first_minimum, DistanceMetric, FeatureWeights, WeightedManhattan};

/// Configuration for [`ClusterTree`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Clusters requested per split
    pub k: usize,
    /// k-means iteration cap per split attempt
    pub max_iterations: usize,
    /// Fresh k-means runs tried before a node is left unsplit
    pub max_split_attempts: usize,
    /// Nodes at this depth are never split
    pub max_depth: usize,
    pub seeding: CentroidSeeding,
    pub weights: FeatureWeights,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iterations: 20,
            max_split_attempts: 3,
            max_depth: 32,
            seeding: CentroidSeeding::Members,
            weights: FeatureWeights::CLUSTERING,
            seed: 42,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> KanjiResult<()> {
        if self.k < 2 {
            return Err(KanjiError::invalid_config(
                "tree.k",
                self.k.to_string(),
                "must be >= 2",
            ));
        }
        if self.max_iterations == 0 {
            return Err(KanjiError::invalid_config(
                "tree.max_iterations",
                "0",
                "must be >= 1",
            ));
        }
        if self.max_split_attempts == 0 {
            return Err(KanjiError::invalid_config(
                "tree.max_split_attempts",
                "0",
                "must be >= 1",
            ));
        }
        self.weights.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterNode {
    id: NodeId,
    depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    members: Vec<usize>,
    representative: FeatureVector,
}

impl ClusterNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Indices into [`ClusterTree::samples`]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Member centroid carrying the first member's label.
    pub fn representative(&self) -> &FeatureVector {
        &self.representative
    }

    pub fn label(&self) -> Option<char> {
        self.representative.label()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Why a node ended up unsplit or split imperfectly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConvergenceIssue {
    /// k-means hit its iteration cap; the split was kept
    NotConverged { iterations: usize },
    /// Every attempt produced fewer than two clusters; the node stays a leaf
    DegenerateSplit { attempts: usize },
    /// The node reached the depth ceiling while still mixed
    DepthCeiling { max_depth: usize },
}

/// Non-fatal build diagnostic attached to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterConvergenceWarning {
    pub node: NodeId,
    pub depth: usize,
    pub members: usize,
    pub issue: ConvergenceIssue,
}

impl fmt::Display for ClusterConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} (depth {}, {} members): ",
            self.node, self.depth, self.members
        )?;
        match self.issue {
            ConvergenceIssue::NotConverged { iterations } => {
                write!(f, "k-means did not converge within {} iterations", iterations)
            }
            ConvergenceIssue::DegenerateSplit { attempts } => {
                write!(f, "no split separated the members after {} attempts", attempts)
            }
            ConvergenceIssue::DepthCeiling { max_depth } => {
                write!(f, "mixed labels left at depth ceiling {}", max_depth)
            }
        }
    }
}

/// Shape of a built tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    pub depth: usize,
    pub nodes: usize,
    pub leaves: usize,
    /// Leaf size to number of leaves with that size
    pub leaf_sizes: BTreeMap<usize, usize>,
    pub warnings: usize,
}

impl fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "depth {} | {} nodes | {} leaves | {} warnings",
            self.depth, self.nodes, self.leaves, self.warnings
        )?;
        for (size, count) in &self.leaf_sizes {
            writeln!(f, "  leaves of size {:>3}: {}", size, count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClusterTree<M = WeightedManhattan> {
    config: TreeConfig,
    metric: M,
    samples: Vec<FeatureVector>,
    nodes: Vec<ClusterNode>,
    warnings: Vec<ClusterConvergenceWarning>,
    tally: Tally,
}

impl ClusterTree<WeightedManhattan> {
    pub fn new(config: TreeConfig) -> KanjiResult<Self> {
        Self::with_metric(config, WeightedManhattan)
    }
}

impl<M: DistanceMetric> ClusterTree<M> {
    pub fn with_metric(config: TreeConfig, metric: M) -> KanjiResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metric,
            samples: Vec::new(),
            nodes: Vec::new(),
            warnings: Vec::new(),
            tally: Tally::default(),
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn samples(&self) -> &[FeatureVector] {
        &self.samples
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&ClusterNode> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> Option<&ClusterNode> {
        self.nodes.first()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    pub fn warnings(&self) -> &[ClusterConvergenceWarning] {
        &self.warnings
    }

    /// Grow the tree with an RNG seeded from the configuration.
    pub fn build(&mut self, training: &[FeatureVector]) -> KanjiResult<()> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.build_with_rng(training, &mut rng)
    }

    /// Grow the tree from scratch, drawing centroids from `rng`.
    pub fn build_with_rng<R: Rng + ?Sized>(
        &mut self,
        training: &[FeatureVector],
        rng: &mut R,
    ) -> KanjiResult<()> {
        if let Some(position) = training.iter().position(|s| s.label().is_none()) {
            return Err(KanjiError::missing_label(format!(
                "tree training sample {}",
                position
            )));
        }
        self.samples = training.to_vec();
        self.nodes.clear();
        self.warnings.clear();
        if self.samples.is_empty() {
            return Ok(());
        }

        let root = self.push_node(None, 0, (0..self.samples.len()).collect());
        let mut queue = VecDeque::from([root]);

        while let Some(id) = queue.pop_front() {
            let depth = self.nodes[id.0].depth;
            let members = self.nodes[id.0].members.clone();

            let outcome = {
                let refs: Vec<&FeatureVector> =
                    members.iter().map(|&i| &self.samples[i]).collect();
                if is_uniform(&refs) {
                    continue;
                }
                if depth >= self.config.max_depth {
                    Err(ConvergenceIssue::DepthCeiling {
                        max_depth: self.config.max_depth,
                    })
                } else {
                    self.split(&refs, rng)
                }
            };

            let partition = match outcome {
                Ok(partition) => partition,
                Err(issue) => {
                    self.warn(id, depth, members.len(), issue);
                    continue;
                }
            };
            if !partition.converged {
                self.warn(
                    id,
                    depth,
                    members.len(),
                    ConvergenceIssue::NotConverged {
                        iterations: partition.iterations,
                    },
                );
            }

            for cluster in partition.clusters {
                let child_members: Vec<usize> = cluster.iter().map(|&pos| members[pos]).collect();
                let child = self.push_node(Some(id), depth + 1, child_members);
                self.nodes[id.0].children.push(child);
                queue.push_back(child);
            }
        }

        let summary = self.summary();
        info!(
            samples = self.samples.len(),
            nodes = summary.nodes,
            leaves = summary.leaves,
            depth = summary.depth,
            warnings = summary.warnings,
            "cluster tree built"
        );
        Ok(())
    }

    fn split<R: Rng + ?Sized>(
        &self,
        members: &[&FeatureVector],
        rng: &mut R,
    ) -> Result<Partition, ConvergenceIssue> {
        let kmeans = KMeans {
            k: self.config.k,
            max_iterations: self.config.max_iterations,
            seeding: self.config.seeding,
            metric: &self.metric,
            weights: &self.config.weights,
        };
        for attempt in 1..=self.config.max_split_attempts {
            let partition = kmeans.partition(members, rng);
            if !partition.is_degenerate() {
                return Ok(partition);
            }
            debug!(attempt, members = members.len(), "degenerate split, retrying");
        }
        Err(ConvergenceIssue::DegenerateSplit {
            attempts: self.config.max_split_attempts,
        })
    }

    fn warn(&mut self, node: NodeId, depth: usize, members: usize, issue: ConvergenceIssue) {
        let warning = ClusterConvergenceWarning {
            node,
            depth,
            members,
            issue,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn push_node(&mut self, parent: Option<NodeId>, depth: usize, members: Vec<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let flats: Vec<FlatFeatures> = members
            .iter()
            .map(|&i| self.samples[i].features().to_flat())
            .collect();
        let label = members.first().and_then(|&i| self.samples[i].label());
        let centroid = StrokeFeatures::from_flat(&running_mean(&flats));
        self.nodes.push(ClusterNode {
            id,
            depth,
            parent,
            children: Vec::new(),
            members,
            representative: FeatureVector::aggregate(label, centroid, None),
        });
        id
    }

    /// Follow the nearest child from the root until no child is nearer than
    /// the `f64::INFINITY` sentinel or a leaf is reached.
    pub fn descend(&self, query: &FeatureVector) -> KanjiResult<NodeId> {
        let mut current = self
            .root()
            .map(ClusterNode::id)
            .ok_or_else(|| KanjiError::empty_candidates(self.name()))?;
        loop {
            let node = &self.nodes[current.0];
            if node.is_leaf() {
                return Ok(current);
            }
            let scores: Vec<f64> = node
                .children
                .iter()
                .map(|child| {
                    self.metric.distance(
                        &self.nodes[child.0].representative,
                        query,
                        &self.config.weights,
                    )
                })
                .collect();
            match first_minimum(&scores) {
                Some(best) => current = node.children[best],
                None => {
                    debug!(node = %current, "no child nearer than sentinel, stopping descent");
                    return Ok(current);
                }
            }
        }
    }

    pub fn summary(&self) -> TreeSummary {
        let mut leaf_sizes = BTreeMap::new();
        for leaf in self.leaves() {
            *leaf_sizes.entry(leaf.members.len()).or_insert(0) += 1;
        }
        TreeSummary {
            depth: self.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
            nodes: self.nodes.len(),
            leaves: leaf_sizes.values().sum(),
            leaf_sizes,
            warnings: self.warnings.len(),
        }
    }
}

impl<M: DistanceMetric> StrokeClassifier for ClusterTree<M> {
    fn name(&self) -> &'static str {
        "cluster-tree"
    }

    fn fit(&mut self, training: &[FeatureVector]) -> KanjiResult<()> {
        self.build(training)
    }

    fn predict(&self, query: &FeatureVector) -> KanjiResult<char> {
        let node = self.descend(query)?;
        self.nodes[node.0]
            .label()
            .ok_or_else(|| KanjiError::missing_label(format!("cluster node {}", node)))
    }

    fn weights(&self) -> FeatureWeights {
        self.config.weights
    }

    /// Weights shape the clustering itself, so the tree is regrown.
    fn set_weights(&mut self, weights: FeatureWeights) -> KanjiResult<()> {
        weights.validate()?;
        self.config.weights = weights;
        if self.samples.is_empty() {
            return Ok(());
        }
        let samples = std::mem::take(&mut self.samples);
        self.build(&samples)
    }

    fn tally(&self) -> &Tally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }
}

/// Whether every member carries the same label. Empty sets are uniform.
pub fn is_uniform(members: &[&FeatureVector]) -> bool {
    match members.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|m| m.label() == first.label()),
    }
}
