//! Fixed-shape stroke feature records.
//!
//! A [`FeatureVector`] holds one handwritten sample: its reduced strokes and
//! the geometric features derived from them. Label aggregates (a per-label
//! mean or a cluster centroid) also carry averaged and deviation features of
//! the same shape, so every distance computation sees identical layouts.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of strokes a character may carry
pub const MAX_STROKES: usize = 30;
/// Number of stroke-to-stroke transitions
pub const MAX_MOVES: usize = MAX_STROKES - 1;
/// Length of the flattened reduced-stroke array `[sx, sy, ex, ey] * 30`
pub const REDUCED_SCALARS: usize = MAX_STROKES * 4;
/// Number of scalar dimensions across all feature families
pub const FEATURE_DIMENSIONS: usize = MAX_STROKES * 4 + MAX_MOVES + 1;

/// All feature families laid out contiguously for vectorised arithmetic
pub type FlatFeatures = [f64; FEATURE_DIMENSIONS];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A stroke reduced to its first and last pen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedStroke {
    pub start: Point,
    pub end: Point,
}

impl ReducedStroke {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Build from `[sx, sy, ex, ey]` scalars.
    pub const fn from_scalars(scalars: [i32; 4]) -> Self {
        Self {
            start: Point::new(scalars[0], scalars[1]),
            end: Point::new(scalars[2], scalars[3]),
        }
    }

    pub fn to_scalars(&self) -> [i32; 4] {
        [self.start.x, self.start.y, self.end.x, self.end.y]
    }

    /// `(end - start)` along each axis.
    pub fn delta(&self) -> (f64, f64) {
        (
            f64::from(self.end.x) - f64::from(self.start.x),
            f64::from(self.end.y) - f64::from(self.start.y),
        )
    }

    pub fn length(&self) -> f64 {
        let (dx, dy) = self.delta();
        dx.hypot(dy)
    }

    /// Direction in degrees, `atan2(dy, dx)`.
    pub fn angle(&self) -> f64 {
        let (dx, dy) = self.delta();
        dy.atan2(dx).to_degrees()
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (f64::from(self.start.x) + f64::from(self.end.x)) / 2.0,
            (f64::from(self.start.y) + f64::from(self.end.y)) / 2.0,
        )
    }

    /// All four scalars are zero, i.e. an unused slot in a reduced array.
    pub fn is_blank(&self) -> bool {
        self.to_scalars() == [0; 4]
    }
}

/// Stroke midpoint offset from the character centroid, normalised by the
/// mean offset magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CentroidOffset {
    pub x: f64,
    pub y: f64,
}

/// One of the weighted feature groups compared by the distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    Lengths,
    Angles,
    Distances,
    Moves,
    Strokes,
}

impl FeatureFamily {
    pub const ALL: [FeatureFamily; 5] = [
        FeatureFamily::Lengths,
        FeatureFamily::Angles,
        FeatureFamily::Distances,
        FeatureFamily::Moves,
        FeatureFamily::Strokes,
    ];

    /// Indices of this family inside [`FlatFeatures`].
    pub fn range(self) -> Range<usize> {
        const ANGLES: usize = MAX_STROKES;
        const DISTANCES: usize = MAX_STROKES * 2;
        const MOVES: usize = MAX_STROKES * 4;
        const STROKES: usize = MOVES + MAX_MOVES;
        match self {
            FeatureFamily::Lengths => 0..ANGLES,
            FeatureFamily::Angles => ANGLES..DISTANCES,
            FeatureFamily::Distances => DISTANCES..MOVES,
            FeatureFamily::Moves => MOVES..STROKES,
            FeatureFamily::Strokes => STROKES..FEATURE_DIMENSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureFamily::Lengths => "lengths",
            FeatureFamily::Angles => "angles",
            FeatureFamily::Distances => "distances",
            FeatureFamily::Moves => "moves",
            FeatureFamily::Strokes => "strokes",
        }
    }
}

impl fmt::Display for FeatureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureFamily {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lengths" | "length" => Ok(FeatureFamily::Lengths),
            "angles" | "angle" => Ok(FeatureFamily::Angles),
            "distances" | "distance" => Ok(FeatureFamily::Distances),
            "moves" | "move" => Ok(FeatureFamily::Moves),
            "strokes" | "stroke_count" => Ok(FeatureFamily::Strokes),
            other => Err(format!("unknown feature family '{}'", other)),
        }
    }
}

/// Geometric features of one character, zero-padded to [`MAX_STROKES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeFeatures {
    pub lengths: [f64; MAX_STROKES],
    pub angles: [f64; MAX_STROKES],
    pub moves: [f64; MAX_MOVES],
    pub distances: [CentroidOffset; MAX_STROKES],
    /// Stroke count as a continuous value so it can be averaged.
    pub strokes: f64,
}

impl StrokeFeatures {
    pub fn to_flat(&self) -> FlatFeatures {
        let mut flat = [0.0; FEATURE_DIMENSIONS];
        flat[FeatureFamily::Lengths.range()].copy_from_slice(&self.lengths);
        flat[FeatureFamily::Angles.range()].copy_from_slice(&self.angles);
        let base = FeatureFamily::Distances.range().start;
        for (i, offset) in self.distances.iter().enumerate() {
            flat[base + 2 * i] = offset.x;
            flat[base + 2 * i + 1] = offset.y;
        }
        flat[FeatureFamily::Moves.range()].copy_from_slice(&self.moves);
        flat[FeatureFamily::Strokes.range().start] = self.strokes;
        flat
    }

    pub fn from_flat(flat: &FlatFeatures) -> Self {
        let mut features = Self::default();
        features
            .lengths
            .copy_from_slice(&flat[FeatureFamily::Lengths.range()]);
        features
            .angles
            .copy_from_slice(&flat[FeatureFamily::Angles.range()]);
        let base = FeatureFamily::Distances.range().start;
        for (i, offset) in features.distances.iter_mut().enumerate() {
            offset.x = flat[base + 2 * i];
            offset.y = flat[base + 2 * i + 1];
        }
        features
            .moves
            .copy_from_slice(&flat[FeatureFamily::Moves.range()]);
        features.strokes = flat[FeatureFamily::Strokes.range().start];
        features
    }
}

/// A single character sample or a label aggregate.
///
/// Samples produced by the extractor carry no averages; [`reference_features`]
/// then falls back to the raw features, which keeps the weighted distance of
/// a vector to itself at exactly zero.
///
/// [`reference_features`]: FeatureVector::reference_features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    label: Option<char>,
    stroke_count: usize,
    reduced_strokes: [ReducedStroke; MAX_STROKES],
    features: StrokeFeatures,
    averages: Option<StrokeFeatures>,
    deviations: Option<StrokeFeatures>,
}

impl FeatureVector {
    pub(crate) fn from_parts(
        label: Option<char>,
        reduced_strokes: [ReducedStroke; MAX_STROKES],
        stroke_count: usize,
        features: StrokeFeatures,
    ) -> Self {
        Self {
            label,
            stroke_count,
            reduced_strokes,
            features,
            averages: None,
            deviations: None,
        }
    }

    /// Wrap precomputed features; the stroke count is read from `features.strokes`.
    pub fn from_features(label: impl Into<Option<char>>, features: StrokeFeatures) -> Self {
        Self::from_parts(
            label.into(),
            [ReducedStroke::default(); MAX_STROKES],
            rounded_count(features.strokes),
            features,
        )
    }

    /// Build a label aggregate whose raw and averaged features coincide.
    pub fn aggregate(
        label: impl Into<Option<char>>,
        mean: StrokeFeatures,
        deviation: Option<StrokeFeatures>,
    ) -> Self {
        Self {
            averages: Some(mean),
            deviations: deviation,
            ..Self::from_features(label, mean)
        }
    }

    pub fn label(&self) -> Option<char> {
        self.label
    }

    /// Overwrite the label with a classifier's prediction.
    pub fn assign_label(&mut self, label: char) {
        self.label = Some(label);
    }

    pub fn stroke_count(&self) -> usize {
        self.stroke_count
    }

    pub fn reduced_strokes(&self) -> &[ReducedStroke; MAX_STROKES] {
        &self.reduced_strokes
    }

    /// Reduced strokes as the flattened 120-scalar array.
    pub fn reduced_scalars(&self) -> Vec<i32> {
        self.reduced_strokes
            .iter()
            .flat_map(ReducedStroke::to_scalars)
            .collect()
    }

    pub fn features(&self) -> &StrokeFeatures {
        &self.features
    }

    pub fn averages(&self) -> Option<&StrokeFeatures> {
        self.averages.as_ref()
    }

    pub fn deviations(&self) -> Option<&StrokeFeatures> {
        self.deviations.as_ref()
    }

    /// Features this vector contributes when it is the reference side of a
    /// comparison: the averages when present, otherwise the raw features.
    pub fn reference_features(&self) -> &StrokeFeatures {
        self.averages.as_ref().unwrap_or(&self.features)
    }

    pub fn is_aggregate(&self) -> bool {
        self.averages.is_some()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label.map(String::from).unwrap_or_else(|| "?".into());
        write!(f, "[{}] strokes: {} [", label, self.stroke_count)?;
        for (i, stroke) in self.reduced_strokes[..self.stroke_count.min(MAX_STROKES)]
            .iter()
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            let [sx, sy, ex, ey] = stroke.to_scalars();
            write!(f, "({},{})->({},{})", sx, sy, ex, ey)?;
        }
        f.write_str("]")
    }
}

pub(crate) fn rounded_count(strokes: f64) -> usize {
    if strokes.is_finite() && strokes > 0.0 {
        (strokes.round() as usize).min(MAX_STROKES)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> StrokeFeatures {
        let mut features = StrokeFeatures::default();
        features.lengths[0] = 12.0;
        features.angles[1] = -45.0;
        features.distances[2] = CentroidOffset { x: 0.5, y: -1.5 };
        features.moves[28] = 90.0;
        features.strokes = 3.0;
        features
    }

    #[test]
    fn test_family_ranges_tile_flat_layout() {
        let mut covered = 0;
        for family in FeatureFamily::ALL {
            let range = family.range();
            assert_eq!(range.start, covered, "{} must follow its predecessor", family);
            covered = range.end;
        }
        assert_eq!(covered, FEATURE_DIMENSIONS);
    }

    #[test]
    fn test_flat_layout_places_families() {
        let flat = sample_features().to_flat();
        assert_eq!(flat[0], 12.0);
        assert_eq!(flat[MAX_STROKES + 1], -45.0);
        assert_eq!(flat[MAX_STROKES * 2 + 4], 0.5);
        assert_eq!(flat[MAX_STROKES * 2 + 5], -1.5);
        assert_eq!(flat[FEATURE_DIMENSIONS - 2], 90.0);
        assert_eq!(flat[FEATURE_DIMENSIONS - 1], 3.0);
        assert_eq!(StrokeFeatures::from_flat(&flat), sample_features());
    }

    #[test]
    fn test_reduced_stroke_geometry() {
        let stroke = ReducedStroke::new(Point::new(0, 0), Point::new(3, 4));
        assert_eq!(stroke.length(), 5.0);
        assert!((stroke.angle() - 53.130_102).abs() < 1e-4);
        assert_eq!(stroke.midpoint(), (1.5, 2.0));
        assert!(!stroke.is_blank());
        assert!(ReducedStroke::default().is_blank());
    }

    #[test]
    fn test_reference_features_prefers_averages() {
        let raw = FeatureVector::from_features('a', sample_features());
        assert!(!raw.is_aggregate());
        assert_eq!(raw.reference_features(), raw.features());
        assert_eq!(raw.stroke_count(), 3);

        let mut mean = sample_features();
        mean.lengths[0] = 99.0;
        let aggregate = FeatureVector::aggregate('a', mean, None);
        assert!(aggregate.is_aggregate());
        assert_eq!(aggregate.reference_features().lengths[0], 99.0);
        assert_eq!(aggregate.features().lengths[0], 99.0);
    }

    #[test]
    fn test_assign_label_overwrites() {
        let mut vector = FeatureVector::from_features(None, sample_features());
        assert_eq!(vector.label(), None);
        vector.assign_label('日');
        assert_eq!(vector.label(), Some('日'));
    }

    #[test]
    fn test_feature_family_parsing() {
        assert_eq!("Moves".parse::<FeatureFamily>(), Ok(FeatureFamily::Moves));
        assert_eq!(
            "stroke_count".parse::<FeatureFamily>(),
            Ok(FeatureFamily::Strokes)
        );
        assert!("curvature".parse::<FeatureFamily>().is_err());
    }
}
