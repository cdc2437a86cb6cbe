//! Engine configuration management via TOML files.
//!
//! Every section is optional; omitted sections and keys fall back to the
//! classifier defaults. Values are validated while the raw TOML is converted
//! into runtime configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::{CentroidSeeding, GaussianConfig, GaussianScoring, KnnConfig, TreeConfig};
use crate::error::KanjiError;
use crate::features::FeatureFamily;
use crate::metric::FeatureWeights;
use crate::optimizer::SearchConfig;

/// Engine configuration loaded from TOML file.
///
/// # Examples
///
/// ```
/// use kanji_recognition_core::EngineConfig;
///
/// let config = EngineConfig::from_str("[knn]\nk = 5").unwrap();
/// assert_eq!(config.knn.k, 5);
/// assert_eq!(config.tree.max_iterations, 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineConfig {
    pub knn: KnnConfig,
    pub gaussian: GaussianConfig,
    pub tree: TreeConfig,
    pub search: SearchConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawEngineConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        Ok(Self {
            knn: KnnConfig::from_raw(&raw.knn)?,
            gaussian: GaussianConfig::from_raw(&raw.gaussian)?,
            tree: TreeConfig::from_raw(&raw.tree)?,
            search: SearchConfig::from_raw(&raw.search)?,
        })
    }
}

impl KnnConfig {
    fn from_raw(raw: &RawKnn) -> Result<Self, ConfigError> {
        let defaults = KnnConfig::default();
        let config = KnnConfig {
            k: raw.k.unwrap_or(defaults.k),
            weights: raw.weights.resolve(defaults.weights),
        };
        config.validate()?;
        Ok(config)
    }
}

impl GaussianConfig {
    fn from_raw(raw: &RawGaussian) -> Result<Self, ConfigError> {
        let defaults = GaussianConfig::default();
        let config = GaussianConfig {
            weights: raw.weights.resolve(defaults.weights),
            scoring: raw.scoring.unwrap_or(defaults.scoring),
        };
        config.validate()?;
        Ok(config)
    }
}

impl TreeConfig {
    fn from_raw(raw: &RawTree) -> Result<Self, ConfigError> {
        let defaults = TreeConfig::default();
        let config = TreeConfig {
            k: raw.k.unwrap_or(defaults.k),
            max_iterations: raw.max_iterations.unwrap_or(defaults.max_iterations),
            max_split_attempts: raw
                .max_split_attempts
                .unwrap_or(defaults.max_split_attempts),
            max_depth: raw.max_depth.unwrap_or(defaults.max_depth),
            seeding: raw.seeding.unwrap_or(defaults.seeding),
            weights: raw.weights.resolve(defaults.weights),
            seed: raw.seed.unwrap_or(defaults.seed),
        };
        config.validate()?;
        Ok(config)
    }
}

impl SearchConfig {
    fn from_raw(raw: &RawSearch) -> Result<Self, ConfigError> {
        let defaults = SearchConfig::default();
        let increment_order = match &raw.increment_order {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<FeatureFamily>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| ConfigError::Parse(format!("search.increment_order: {}", err)))?,
            None => defaults.increment_order,
        };
        let config = SearchConfig {
            step: raw.step.unwrap_or(defaults.step),
            increment_order,
            max_evaluations: raw.max_evaluations.unwrap_or(defaults.max_evaluations),
            max_depth: raw.max_depth.unwrap_or(defaults.max_depth),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEngineConfig {
    #[serde(default)]
    knn: RawKnn,
    #[serde(default)]
    gaussian: RawGaussian,
    #[serde(default)]
    tree: RawTree,
    #[serde(default)]
    search: RawSearch,
}

/// Partial weights; missing families keep the section's default profile.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    lengths: Option<f64>,
    angles: Option<f64>,
    distances: Option<f64>,
    moves: Option<f64>,
    strokes: Option<f64>,
}

impl RawWeights {
    fn resolve(&self, defaults: FeatureWeights) -> FeatureWeights {
        FeatureWeights {
            lengths: self.lengths.unwrap_or(defaults.lengths),
            angles: self.angles.unwrap_or(defaults.angles),
            distances: self.distances.unwrap_or(defaults.distances),
            moves: self.moves.unwrap_or(defaults.moves),
            strokes: self.strokes.unwrap_or(defaults.strokes),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKnn {
    k: Option<usize>,
    #[serde(default)]
    weights: RawWeights,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGaussian {
    scoring: Option<GaussianScoring>,
    #[serde(default)]
    weights: RawWeights,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTree {
    k: Option<usize>,
    max_iterations: Option<usize>,
    max_split_attempts: Option<usize>,
    max_depth: Option<usize>,
    seeding: Option<CentroidSeeding>,
    seed: Option<u64>,
    #[serde(default)]
    weights: RawWeights,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSearch {
    step: Option<f64>,
    increment_order: Option<Vec<String>>,
    max_evaluations: Option<usize>,
    max_depth: Option<usize>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(KanjiError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
            ConfigError::Invalid(err) => write!(f, "Invalid value: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<KanjiError> for ConfigError {
    fn from(value: KanjiError) -> Self {
        ConfigError::Invalid(value)
    }
}
