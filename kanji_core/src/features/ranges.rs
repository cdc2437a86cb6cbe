//! Per-dimension minimum and maximum over a set of feature vectors.

use rand::Rng;
use serde::Serialize;

use super::record::{
    FeatureFamily, FeatureVector, FlatFeatures, StrokeFeatures, FEATURE_DIMENSIONS,
};

/// Observed bounds of every feature dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRanges {
    min: FlatFeatures,
    max: FlatFeatures,
}

/// Bounds of one family, reduced over its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FamilyRange {
    pub family: FeatureFamily,
    pub min: f64,
    pub max: f64,
}

impl FeatureRanges {
    /// Bounds of the raw features of `vectors`; `None` when empty.
    pub fn observe<'a, I>(vectors: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        let mut ranges: Option<Self> = None;
        for vector in vectors {
            let flat = vector.features().to_flat();
            match ranges.as_mut() {
                None => {
                    ranges = Some(Self {
                        min: flat,
                        max: flat,
                    })
                }
                Some(ranges) => {
                    for i in 0..FEATURE_DIMENSIONS {
                        ranges.min[i] = ranges.min[i].min(flat[i]);
                        ranges.max[i] = ranges.max[i].max(flat[i]);
                    }
                }
            }
        }
        ranges
    }

    pub fn min(&self) -> StrokeFeatures {
        StrokeFeatures::from_flat(&self.min)
    }

    pub fn max(&self) -> StrokeFeatures {
        StrokeFeatures::from_flat(&self.max)
    }

    pub fn family(&self, family: FeatureFamily) -> FamilyRange {
        let range = family.range();
        FamilyRange {
            family,
            min: self.min[range.clone()]
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
            max: self.max[range].iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Draw a feature set uniformly inside the observed bounds.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> StrokeFeatures {
        let mut flat = [0.0; FEATURE_DIMENSIONS];
        for (i, value) in flat.iter_mut().enumerate() {
            let (lo, hi) = (self.min[i], self.max[i]);
            *value = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        }
        StrokeFeatures::from_flat(&flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vector(length: f64, angle: f64) -> FeatureVector {
        let mut features = StrokeFeatures::default();
        features.lengths[0] = length;
        features.angles[0] = angle;
        features.strokes = 1.0;
        FeatureVector::from_features('a', features)
    }

    #[test]
    fn test_observe_empty_is_none() {
        assert!(FeatureRanges::observe(std::iter::empty::<&FeatureVector>()).is_none());
    }

    #[test]
    fn test_observe_tracks_bounds() {
        let samples = vec![vector(10.0, -90.0), vector(600.0, 45.0), vector(30.0, 0.0)];
        let ranges = FeatureRanges::observe(&samples).unwrap();
        assert_eq!(ranges.min().lengths[0], 10.0);
        assert_eq!(ranges.max().lengths[0], 600.0);
        let angles = ranges.family(FeatureFamily::Angles);
        assert_eq!(angles.min, -90.0);
        assert_eq!(angles.max, 45.0);
    }

    #[test]
    fn test_sample_stays_inside_bounds() {
        let samples = vec![vector(10.0, -90.0), vector(600.0, 90.0)];
        let ranges = FeatureRanges::observe(&samples).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let drawn = ranges.sample(&mut rng);
            assert!((10.0..=600.0).contains(&drawn.lengths[0]));
            assert!((-90.0..=90.0).contains(&drawn.angles[0]));
            assert_eq!(drawn.lengths[1], 0.0);
            assert_eq!(drawn.strokes, 1.0);
        }
    }
}
