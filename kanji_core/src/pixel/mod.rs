//! Pixel-grid representation of characters.
//!
//! A [`PixelKanji`] is a rasterised character on a fixed grid (400×400 for
//! collected data). Per-label [`PixelDistribution`]s hold the running mean
//! and sample deviation of every pixel. Grids of different shapes are never
//! compared.

pub mod classifier;

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::error::{KanjiError, KanjiResult};

pub use classifier::{PixelGaussian, PixelNearestNeighbor, PixelPrediction};

/// Side length of collected pixel grids
pub const PIXEL_GRID: usize = 400;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelKanji {
    label: Option<char>,
    pixels: Array2<f64>,
}

impl PixelKanji {
    pub fn new(label: impl Into<Option<char>>, pixels: Array2<f64>) -> Self {
        Self {
            label: label.into(),
            pixels,
        }
    }

    /// An empty [`PIXEL_GRID`]-sized canvas.
    pub fn blank(label: impl Into<Option<char>>) -> Self {
        Self::new(label, Array2::zeros((PIXEL_GRID, PIXEL_GRID)))
    }

    /// Build from rows of on/off pixels; all rows must have equal length.
    pub fn from_rows(label: impl Into<Option<char>>, rows: &[Vec<u8>]) -> KanjiResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut pixels = Array2::zeros((height, width));
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(KanjiError::dimension_mismatch(
                    (height, width),
                    (height, row.len()),
                    format!("pixel row {}", y),
                ));
            }
            for (x, &value) in row.iter().enumerate() {
                pixels[[y, x]] = f64::from(value);
            }
        }
        Ok(Self::new(label, pixels))
    }

    pub fn label(&self) -> Option<char> {
        self.label
    }

    pub fn assign_label(&mut self, label: char) {
        self.label = Some(label);
    }

    pub fn pixels(&self) -> &Array2<f64> {
        &self.pixels
    }

    pub fn dim(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    /// Sum of absolute pixel differences.
    pub fn distance(&self, other: &PixelKanji) -> KanjiResult<f64> {
        ensure_same_dim(self.dim(), other.dim(), "pixel distance")?;
        Ok(self
            .pixels
            .iter()
            .zip(other.pixels.iter())
            .map(|(a, b)| (a - b).abs())
            .sum())
    }
}

/// Per-pixel mean and sample deviation for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelDistribution {
    label: char,
    tokens: usize,
    #[serde(skip)]
    average: Array2<f64>,
    #[serde(skip)]
    deviation: Array2<f64>,
}

impl PixelDistribution {
    pub fn build(label: char, tokens: &[&PixelKanji]) -> KanjiResult<Self> {
        let first = tokens
            .first()
            .ok_or_else(|| KanjiError::degenerate_distribution(label, 0))?;
        let dim = first.dim();

        let mut average = Array2::<f64>::zeros(dim);
        for (n, token) in tokens.iter().enumerate() {
            ensure_same_dim(dim, token.dim(), "pixel distribution")?;
            let n = n as f64;
            average = (average * n + &token.pixels) / (n + 1.0);
        }

        let deviation = if tokens.len() < 2 {
            let err = KanjiError::degenerate_distribution(label, tokens.len());
            debug!(%err, "using zero pixel deviation");
            Array2::zeros(dim)
        } else {
            let mut squares = Array2::<f64>::zeros(dim);
            for token in tokens {
                let diff = &token.pixels - &average;
                squares += &(&diff * &diff);
            }
            let denominator = (tokens.len() - 1) as f64;
            squares.mapv(|v| (v / denominator).sqrt())
        };

        Ok(Self {
            label,
            tokens: tokens.len(),
            average,
            deviation,
        })
    }

    pub fn label(&self) -> char {
        self.label
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn average(&self) -> &Array2<f64> {
        &self.average
    }

    pub fn deviation(&self) -> &Array2<f64> {
        &self.deviation
    }

    /// Sum of `|pixel - mean| / (deviation + 1)`.
    pub fn z_score(&self, query: &PixelKanji) -> KanjiResult<f64> {
        ensure_same_dim(self.average.dim(), query.dim(), "pixel z-score")?;
        Ok(ndarray::Zip::from(&query.pixels)
            .and(&self.average)
            .and(&self.deviation)
            .fold(0.0, |acc, &x, &mean, &sd| acc + (x - mean).abs() / (sd + 1.0)))
    }

    /// Sum of absolute differences from the mean.
    pub fn distance(&self, query: &PixelKanji) -> KanjiResult<f64> {
        ensure_same_dim(self.average.dim(), query.dim(), "pixel distance")?;
        Ok(ndarray::Zip::from(&query.pixels)
            .and(&self.average)
            .fold(0.0, |acc, &x, &mean| acc + (x - mean).abs()))
    }
}

fn ensure_same_dim(
    expected: (usize, usize),
    got: (usize, usize),
    context: &str,
) -> KanjiResult<()> {
    if expected != got {
        return Err(KanjiError::dimension_mismatch(expected, got, context));
    }
    Ok(())
}
