//! # Kanji Recognition Core
//!
//! A stroke-feature classification engine for handwritten kanji. Raw pen
//! coordinate streams are reduced to per-stroke endpoints, turned into
//! fixed-shape geometric features (lengths, angles, transition angles and
//! centroid offsets), and classified by k-nearest-neighbor, per-label
//! Gaussian scoring, or a divisive k-means cluster tree. A memoised greedy
//! search tunes the per-family feature weights against held-out samples.
//!
//! ## Quick Start
//!
//! ```rust
//! use kanji_recognition_core::{
//!     FeatureWeights, KnnConfig, NearestNeighbor, StrokeClassifier, StrokeExtractor,
//! };
//!
//! let extractor = StrokeExtractor::new();
//! // "一": one horizontal stroke; "十": a horizontal and a vertical stroke.
//! let one = extractor.extract('一', &[10, 50, 50, 50, 90, 50, -1, 0])?;
//! let ten = extractor.extract('十', &[10, 50, 90, 50, -1, 0, 50, 10, 50, 90, -1, 0])?;
//!
//! let mut knn = NearestNeighbor::new(KnnConfig {
//!     k: 1,
//!     weights: FeatureWeights::UNIFORM,
//! })?;
//! knn.fit(&[one, ten])?;
//!
//! let mut query = extractor.extract(None, &[12, 48, 88, 52, -1, 0, 52, 12, 49, 88])?;
//! assert_eq!(knn.classify(&mut query)?, '十');
//! assert_eq!(query.label(), Some('十'));
//! # Ok::<(), kanji_recognition_core::KanjiError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`features`] - Stroke reduction and feature extraction
//! - [`metric`] - Feature weights and weighted distance
//! - [`distribution`] - Per-label means and deviations
//! - [`classifier`] - kNN, Gaussian and cluster-tree classifiers
//! - [`optimizer`] - Memoised weight search
//! - [`evaluation`] - Batch evaluation with malformed-sample isolation
//! - [`pixel`] - Pixel-grid distributions and classifiers
//! - [`data`] - Collected-sample format and synthetic datasets
//! - [`config`] - Engine configuration via TOML
//! - [`logging`] - JSON line-delimited run logs

pub mod classifier;
pub mod config;
pub mod data;
pub mod distribution;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod logging;
pub mod metric;
pub mod optimizer;
pub mod pixel;

pub use classifier::{
    CentroidSeeding, ClusterConvergenceWarning, ClusterNode, ClusterTree, ConvergenceIssue,
    GaussianClassifier, GaussianConfig, GaussianPrediction, GaussianScoring, KnnConfig,
    LabelTally, NearestNeighbor, Neighbor, NodeId, StrokeClassifier, Tally, TreeConfig,
    TreeSummary,
};
pub use config::{ConfigError, EngineConfig};
pub use data::{StrokeDataset, StrokeDatasetConfig};
pub use distribution::{DistributionModel, LabelDistribution};
pub use error::{KanjiError, KanjiResult};
pub use evaluation::{evaluate, score_weights, EvaluationHarness, EvaluationReport};
pub use features::{
    CentroidOffset, FamilyRange, FeatureFamily, FeatureRanges, FeatureVector, Point,
    ReducedStroke, StrokeExtractor, StrokeFeatures, MAX_STROKES,
};
pub use metric::{distance, DistanceMetric, FeatureWeights, WeightedManhattan};
pub use optimizer::{SearchConfig, SearchOutcome, WeightSearch};
pub use pixel::{PixelDistribution, PixelGaussian, PixelKanji, PixelNearestNeighbor};
