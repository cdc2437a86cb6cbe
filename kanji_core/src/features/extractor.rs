//! Raw coordinate streams to feature vectors.
//!
//! A stream is a flat sequence of `x, y` integer pairs. The pair `(-1, 0)`
//! lifts the pen and closes the current stroke; `(-1, -1)` marks the end of
//! the character. Each stroke is reduced to its first and last points, and
//! lengths, angles, transition angles and centroid offsets are derived from
//! those endpoints alone.
//!
//! In the reduced `[sx, sy, ex, ey]` array form, an all-zero quadruple is an
//! unused slot. A real dot drawn at the origin, `(0, 0) -> (0, 0)`, has the
//! same encoding, so it is dropped when a sample is written out and read back.

use tracing::trace;

use super::record::{
    CentroidOffset, FeatureVector, Point, ReducedStroke, StrokeFeatures, MAX_MOVES, MAX_STROKES,
    REDUCED_SCALARS,
};
use crate::error::{KanjiError, KanjiResult};

/// Pen-up sentinel separating strokes.
pub const PEN_UP: (i32, i32) = (-1, 0);
/// End-of-character marker; nothing may follow it.
pub const END_OF_CHARACTER: (i32, i32) = (-1, -1);

/// Turns raw strokes into [`FeatureVector`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrokeExtractor;

impl StrokeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Decode a coordinate stream and derive its features.
    pub fn extract(
        &self,
        label: impl Into<Option<char>>,
        stream: &[i32],
    ) -> KanjiResult<FeatureVector> {
        let strokes = reduce_stream(stream)?;
        self.from_strokes(label, &strokes)
    }

    /// Like [`extract`](Self::extract), but the decoded stroke count must
    /// equal `declared`.
    pub fn extract_declared(
        &self,
        label: impl Into<Option<char>>,
        declared: usize,
        stream: &[i32],
    ) -> KanjiResult<FeatureVector> {
        let strokes = reduce_stream(stream)?;
        if strokes.len() != declared {
            return Err(KanjiError::decode(format!(
                "declared {} strokes but the stream holds {}",
                declared,
                strokes.len()
            )));
        }
        self.from_strokes(label, &strokes)
    }

    /// Rebuild a sample from its flattened `[sx, sy, ex, ey] * n` array.
    ///
    /// Trailing all-zero quadruples are unused slots, including a dot at the
    /// origin. A used stroke after an unused slot is rejected.
    pub fn from_reduced(
        &self,
        label: impl Into<Option<char>>,
        scalars: &[i32],
    ) -> KanjiResult<FeatureVector> {
        if scalars.len() > REDUCED_SCALARS {
            return Err(KanjiError::decode(format!(
                "{} reduced scalars exceed the maximum of {}",
                scalars.len(),
                REDUCED_SCALARS
            )));
        }
        if scalars.len() % 4 != 0 {
            return Err(KanjiError::decode(format!(
                "{} reduced scalars do not form whole strokes",
                scalars.len()
            )));
        }

        let slots: Vec<ReducedStroke> = scalars
            .chunks_exact(4)
            .map(|chunk| ReducedStroke::from_scalars([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let used = slots.iter().take_while(|stroke| !stroke.is_blank()).count();
        if let Some(gap) = slots[used..].iter().position(|stroke| !stroke.is_blank()) {
            return Err(KanjiError::decode(format!(
                "stroke {} follows an empty slot at {}",
                used + gap + 1,
                used + 1
            )));
        }
        self.from_strokes(label, &slots[..used])
    }

    /// Derive features from already-reduced strokes.
    pub fn from_strokes(
        &self,
        label: impl Into<Option<char>>,
        strokes: &[ReducedStroke],
    ) -> KanjiResult<FeatureVector> {
        if strokes.len() > MAX_STROKES {
            return Err(too_many_strokes(strokes.len()));
        }
        let mut reduced = [ReducedStroke::default(); MAX_STROKES];
        reduced[..strokes.len()].copy_from_slice(strokes);
        Ok(FeatureVector::from_parts(
            label.into(),
            reduced,
            strokes.len(),
            derive_features(strokes),
        ))
    }
}

/// Split a coordinate stream into strokes reduced to their endpoints.
pub fn reduce_stream(stream: &[i32]) -> KanjiResult<Vec<ReducedStroke>> {
    if stream.is_empty() {
        return Err(KanjiError::decode("coordinate stream is empty"));
    }
    if stream.len() % 2 != 0 {
        return Err(KanjiError::decode(format!(
            "odd number of coordinates ({})",
            stream.len()
        )));
    }

    let mut strokes = Vec::new();
    let mut current: Option<ReducedStroke> = None;
    let mut finished = false;

    for (index, pair) in stream.chunks_exact(2).enumerate() {
        let coordinate = (pair[0], pair[1]);
        if finished {
            return Err(KanjiError::decode(format!(
                "coordinate pair {} follows the end-of-character marker",
                index
            )));
        }
        match coordinate {
            PEN_UP => {
                let stroke = current.take().ok_or_else(|| {
                    KanjiError::decode(format!("pen-up at pair {} closes an empty stroke", index))
                })?;
                push_stroke(&mut strokes, stroke)?;
            }
            END_OF_CHARACTER => {
                finished = true;
                if let Some(stroke) = current.take() {
                    push_stroke(&mut strokes, stroke)?;
                }
            }
            (x, y) => {
                let point = Point::new(x, y);
                match current.as_mut() {
                    Some(stroke) => stroke.end = point,
                    None => current = Some(ReducedStroke::new(point, point)),
                }
            }
        }
    }
    if let Some(stroke) = current.take() {
        push_stroke(&mut strokes, stroke)?;
    }

    if strokes.is_empty() {
        return Err(KanjiError::decode("stream contains no strokes"));
    }
    trace!(strokes = strokes.len(), "reduced coordinate stream");
    Ok(strokes)
}

fn push_stroke(strokes: &mut Vec<ReducedStroke>, stroke: ReducedStroke) -> KanjiResult<()> {
    if strokes.len() == MAX_STROKES {
        return Err(too_many_strokes(strokes.len() + 1));
    }
    strokes.push(stroke);
    Ok(())
}

fn too_many_strokes(count: usize) -> KanjiError {
    KanjiError::decode(format!(
        "{} strokes exceed the maximum of {}",
        count, MAX_STROKES
    ))
}

/// Compute every feature family for up to [`MAX_STROKES`] strokes.
pub fn derive_features(strokes: &[ReducedStroke]) -> StrokeFeatures {
    let strokes = &strokes[..strokes.len().min(MAX_STROKES)];
    let mut features = StrokeFeatures::default();

    for (i, stroke) in strokes.iter().enumerate() {
        features.lengths[i] = stroke.length();
        features.angles[i] = stroke.angle();
    }
    for (i, pair) in strokes.windows(2).enumerate().take(MAX_MOVES) {
        features.moves[i] = transition_angle(&pair[0], &pair[1]);
    }
    features.distances = centroid_offsets(strokes);
    features.strokes = strokes.len() as f64;
    features
}

/// Angle in degrees of the pen travel from the end of `from` to the start of `to`.
pub fn transition_angle(from: &ReducedStroke, to: &ReducedStroke) -> f64 {
    let dx = f64::from(to.start.x) - f64::from(from.end.x);
    let dy = f64::from(to.start.y) - f64::from(from.end.y);
    dy.atan2(dx).to_degrees()
}

/// Offsets of stroke midpoints from their centroid, divided by the mean
/// offset magnitude. Zero for fewer than two strokes or coincident midpoints.
pub fn centroid_offsets(strokes: &[ReducedStroke]) -> [CentroidOffset; MAX_STROKES] {
    let mut offsets = [CentroidOffset::default(); MAX_STROKES];
    let strokes = &strokes[..strokes.len().min(MAX_STROKES)];
    if strokes.len() < 2 {
        return offsets;
    }

    let midpoints: Vec<(f64, f64)> = strokes.iter().map(ReducedStroke::midpoint).collect();
    let n = midpoints.len() as f64;
    let cx = midpoints.iter().map(|(x, _)| x).sum::<f64>() / n;
    let cy = midpoints.iter().map(|(_, y)| y).sum::<f64>() / n;

    let raw: Vec<(f64, f64)> = midpoints.iter().map(|(x, y)| (x - cx, y - cy)).collect();
    let mean_magnitude = raw.iter().map(|(dx, dy)| dx.hypot(*dy)).sum::<f64>() / n;
    if mean_magnitude <= f64::EPSILON {
        return offsets;
    }

    for (offset, (dx, dy)) in offsets.iter_mut().zip(raw) {
        *offset = CentroidOffset {
            x: dx / mean_magnitude,
            y: dy / mean_magnitude,
        };
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_point_stroke_reduces_to_endpoints() {
        let stream = [0, 0, 5, 5, 10, 0, -1, 0];
        let strokes = reduce_stream(&stream).unwrap();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].start, Point::new(0, 0));
        assert_eq!(strokes[0].end, Point::new(10, 0));

        let vector = StrokeExtractor::new().extract('一', &stream).unwrap();
        assert_eq!(vector.stroke_count(), 1);
        assert_eq!(vector.features().lengths[0], 10.0);
        assert_eq!(vector.features().angles[0], 0.0);
        assert!(vector.features().lengths[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stream_without_trailing_sentinel_closes_last_stroke() {
        let strokes = reduce_stream(&[0, 0, 10, 0, -1, 0, 0, 10, 10, 10]).unwrap();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[1].end, Point::new(10, 10));
    }

    #[test]
    fn test_odd_coordinate_count_is_rejected() {
        let err = reduce_stream(&[0, 0, 5]).unwrap_err();
        assert!(matches!(err, KanjiError::Decode { .. }));
        assert!(err.to_string().contains("odd"));
    }

    #[test]
    fn test_empty_stroke_is_rejected() {
        assert!(reduce_stream(&[-1, 0]).is_err());
        assert!(reduce_stream(&[0, 0, 1, 1, -1, 0, -1, 0]).is_err());
        assert!(reduce_stream(&[]).is_err());
    }

    #[test]
    fn test_end_marker_stops_the_stream() {
        let strokes = reduce_stream(&[0, 0, 4, 4, -1, -1]).unwrap();
        assert_eq!(strokes.len(), 1);
        assert!(reduce_stream(&[0, 0, 4, 4, -1, -1, 2, 2]).is_err());
    }

    #[test]
    fn test_thirty_one_strokes_are_rejected() {
        let mut stream = Vec::new();
        for i in 0..31 {
            stream.extend_from_slice(&[i, 0, i, 10, -1, 0]);
        }
        let err = reduce_stream(&stream).unwrap_err();
        assert!(err.to_string().contains("31 strokes"));

        stream.truncate(30 * 6);
        assert_eq!(reduce_stream(&stream).unwrap().len(), MAX_STROKES);
    }

    #[test]
    fn test_declared_count_mismatch() {
        let extractor = StrokeExtractor::new();
        let stream = [0, 0, 10, 0, -1, 0, 0, 5, 10, 5, -1, 0];
        assert!(extractor.extract_declared('二', 2, &stream).is_ok());
        let err = extractor.extract_declared('二', 3, &stream).unwrap_err();
        assert!(err.to_string().contains("declared 3"));
    }

    #[test]
    fn test_single_stroke_has_zero_offsets_and_moves() {
        let vector = StrokeExtractor::new()
            .extract('丨', &[5, 0, 5, 40])
            .unwrap();
        let features = vector.features();
        assert!(features.moves.iter().all(|&m| m == 0.0));
        assert!(features
            .distances
            .iter()
            .all(|d| d.x == 0.0 && d.y == 0.0));
        assert_eq!(features.angles[0], 90.0);
    }

    #[test]
    fn test_transition_angle_points_from_end_to_next_start() {
        let first = ReducedStroke::new(Point::new(0, 0), Point::new(10, 0));
        let second = ReducedStroke::new(Point::new(10, 10), Point::new(0, 10));
        assert_eq!(transition_angle(&first, &second), 90.0);
    }

    #[test]
    fn test_extreme_coordinates_stay_finite() {
        let stream = [
            i32::MIN, i32::MIN, i32::MAX, i32::MAX, -1, 0,
            i32::MAX, i32::MIN, i32::MIN, i32::MAX,
        ];
        let vector = StrokeExtractor::new().extract('x', &stream).unwrap();
        let features = vector.features();
        assert!(features.to_flat().iter().all(|v| v.is_finite()));
        assert!((features.moves[0] + 90.0).abs() < 1e-9);
        assert!((features.angles[0] - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_offsets_are_scaled_by_mean_magnitude() {
        let strokes = [
            ReducedStroke::new(Point::new(0, 0), Point::new(0, 0)),
            ReducedStroke::new(Point::new(10, 0), Point::new(10, 0)),
        ];
        let offsets = centroid_offsets(&strokes);
        assert_eq!(offsets[0], CentroidOffset { x: -1.0, y: 0.0 });
        assert_eq!(offsets[1], CentroidOffset { x: 1.0, y: 0.0 });
        assert_eq!(offsets[2], CentroidOffset::default());
    }

    #[test]
    fn test_coincident_midpoints_do_not_divide_by_zero() {
        let stroke = ReducedStroke::new(Point::new(0, 0), Point::new(10, 10));
        let offsets = centroid_offsets(&[stroke, stroke]);
        assert!(offsets.iter().all(|d| d.x == 0.0 && d.y == 0.0));
    }

    #[test]
    fn test_from_reduced_matches_stream_extraction() {
        let extractor = StrokeExtractor::new();
        let streamed = extractor
            .extract('十', &[0, 50, 100, 50, -1, 0, 50, 0, 50, 100, -1, 0])
            .unwrap();
        let reduced = extractor
            .from_reduced('十', &streamed.reduced_scalars())
            .unwrap();
        assert_eq!(reduced, streamed);
    }

    #[test]
    fn test_from_reduced_rejects_gaps_and_partial_strokes() {
        let extractor = StrokeExtractor::new();
        assert!(extractor
            .from_reduced('x', &[1, 1, 2, 2, 0, 0, 0, 0, 3, 3, 4, 4])
            .is_err());
        assert!(extractor.from_reduced('x', &[1, 1, 2]).is_err());
        assert!(extractor.from_reduced('x', &[1; 124]).is_err());
    }
}
