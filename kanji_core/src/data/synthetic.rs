//! Synthetic handwriting dataset for validation experiments
//!
//! Each label gets a random template of straight strokes on a square canvas.
//! Samples jitter every template endpoint, are rendered to a raw coordinate
//! stream with interior points and pen-up sentinels, and then go through the
//! regular stroke extractor.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::KanjiResult;
use crate::features::{
    FeatureVector, Point, ReducedStroke, StrokeExtractor, MAX_STROKES, PEN_UP,
};

/// Configuration for dataset generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeDatasetConfig {
    pub labels: Vec<char>,
    pub samples_per_label: usize,
    /// Upper bound on strokes per template
    pub max_strokes: usize,
    /// Maximum endpoint displacement per sample, in canvas units
    pub jitter: i32,
    /// Canvas side length
    pub canvas: i32,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for StrokeDatasetConfig {
    fn default() -> Self {
        Self {
            labels: "一二三十木日月山川人".chars().collect(),
            samples_per_label: 10,
            max_strokes: 8,
            jitter: 6,
            canvas: 400,
            seed: 42,
        }
    }
}

/// The strokes every sample of one label is drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeTemplate {
    pub label: char,
    pub strokes: Vec<ReducedStroke>,
}

/// Synthetic stroke dataset
pub struct StrokeDataset {
    pub samples: Vec<FeatureVector>,
    pub templates: Vec<StrokeTemplate>,
    pub config: StrokeDatasetConfig,
}

impl StrokeDataset {
    pub fn generate(config: StrokeDatasetConfig) -> KanjiResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let extractor = StrokeExtractor::new();
        let margin = (config.jitter + 1).max(1);
        let max_strokes = config.max_strokes.clamp(1, MAX_STROKES);

        let templates: Vec<StrokeTemplate> = config
            .labels
            .iter()
            .map(|&label| {
                let count = rng.gen_range(1..=max_strokes);
                let strokes = (0..count)
                    .map(|_| {
                        ReducedStroke::new(
                            random_point(&mut rng, margin, config.canvas),
                            random_point(&mut rng, margin, config.canvas),
                        )
                    })
                    .collect();
                StrokeTemplate { label, strokes }
            })
            .collect();

        let mut samples = Vec::with_capacity(templates.len() * config.samples_per_label);
        for template in &templates {
            for _ in 0..config.samples_per_label {
                let strokes: Vec<ReducedStroke> = template
                    .strokes
                    .iter()
                    .map(|stroke| {
                        ReducedStroke::new(
                            jitter(&mut rng, stroke.start, config.jitter),
                            jitter(&mut rng, stroke.end, config.jitter),
                        )
                    })
                    .collect();
                let stream = render_stream(&strokes);
                samples.push(extractor.extract(template.label, &stream)?);
            }
        }

        samples.shuffle(&mut rng);

        Ok(Self {
            samples,
            templates,
            config,
        })
    }

    /// Split dataset into train and test sets
    ///
    /// # Arguments
    /// * `train_ratio` - Fraction of data to use for training (e.g., 0.8)
    pub fn split(self, train_ratio: f32) -> (Vec<FeatureVector>, Vec<FeatureVector>) {
        let split_idx = (self.samples.len() as f32 * train_ratio) as usize;
        let (train, test) = self.samples.split_at(split_idx.min(self.samples.len()));
        (train.to_vec(), test.to_vec())
    }

    /// Split each label separately so every label appears in training.
    pub fn stratified_split(self, train_ratio: f32) -> (Vec<FeatureVector>, Vec<FeatureVector>) {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for label in &self.config.labels {
            let group: Vec<&FeatureVector> = self
                .samples
                .iter()
                .filter(|s| s.label() == Some(*label))
                .collect();
            let split_idx =
                ((group.len() as f32 * train_ratio) as usize).clamp(1, group.len().max(1));
            for (i, sample) in group.into_iter().enumerate() {
                if i < split_idx {
                    train.push(sample.clone());
                } else {
                    test.push(sample.clone());
                }
            }
        }
        (train, test)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn random_point(rng: &mut StdRng, margin: i32, canvas: i32) -> Point {
    let hi = (canvas - margin).max(margin + 1);
    Point::new(rng.gen_range(margin..hi), rng.gen_range(margin..hi))
}

fn jitter(rng: &mut StdRng, point: Point, amount: i32) -> Point {
    if amount <= 0 {
        return point;
    }
    Point::new(
        point.x.saturating_add(rng.gen_range(-amount..=amount)),
        point.y.saturating_add(rng.gen_range(-amount..=amount)),
    )
}

fn midway(a: i32, b: i32) -> i32 {
    // The mean of two i32 values always fits in i32.
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

/// Render strokes as a raw stream: start, midpoint, end, then a pen-up.
pub fn render_stream(strokes: &[ReducedStroke]) -> Vec<i32> {
    let mut stream = Vec::with_capacity(strokes.len() * 8);
    for stroke in strokes {
        let mid_x = midway(stroke.start.x, stroke.end.x);
        let mid_y = midway(stroke.start.y, stroke.end.y);
        stream.extend_from_slice(&[
            stroke.start.x,
            stroke.start.y,
            mid_x,
            mid_y,
            stroke.end.x,
            stroke.end.y,
            PEN_UP.0,
            PEN_UP.1,
        ]);
    }
    stream
}
