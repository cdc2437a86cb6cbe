//! Stroke features: records, extraction from raw streams, and per-dimension ranges.

pub mod extractor;
pub mod ranges;
pub mod record;

pub use extractor::{derive_features, reduce_stream, StrokeExtractor, END_OF_CHARACTER, PEN_UP};
pub use ranges::{FamilyRange, FeatureRanges};
pub use record::{
    CentroidOffset, FeatureFamily, FeatureVector, FlatFeatures, Point, ReducedStroke,
    StrokeFeatures, FEATURE_DIMENSIONS, MAX_MOVES, MAX_STROKES, REDUCED_SCALARS,
};
