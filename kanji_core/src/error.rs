//! Error types for feature extraction and classification.
//!
//! Malformed samples surface as [`KanjiError::Decode`] and are isolated by the
//! evaluation harness. A label whose spread cannot be estimated produces
//! [`KanjiError::DegenerateDistribution`], which the distribution model
//! recovers from locally. Classifying against nothing is always fatal.

use std::fmt;

/// Result type alias for kanji recognition operations
pub type KanjiResult<T> = Result<T, KanjiError>;

/// Error type shared by the extractor, classifiers and weight search
#[derive(Debug, Clone, PartialEq)]
pub enum KanjiError {
    /// Raw stroke data could not be decoded into a feature vector
    Decode { line: Option<usize>, reason: String },

    /// Fewer than two tokens back a label, so no sample deviation exists
    DegenerateDistribution { label: char, tokens: usize },

    /// Classification was attempted with no training data
    EmptyCandidateSet { classifier: String },

    /// A training sample or cluster member carries no label
    MissingLabel { context: String },

    /// Invalid configuration parameter
    InvalidConfiguration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Pixel grids or flattened features disagree in shape
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
        context: String,
    },

    /// Reading a corpus file failed
    Io { path: String, details: String },
}

impl fmt::Display for KanjiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KanjiError::Decode {
                line: Some(line),
                reason,
            } => write!(f, "Malformed stroke data on line {}: {}", line, reason),
            KanjiError::Decode { line: None, reason } => {
                write!(f, "Malformed stroke data: {}", reason)
            }
            KanjiError::DegenerateDistribution { label, tokens } => {
                write!(
                    f,
                    "Degenerate distribution for '{}': {} token(s) cannot yield a sample deviation",
                    label, tokens
                )
            }
            KanjiError::EmptyCandidateSet { classifier } => {
                write!(
                    f,
                    "Empty candidate set: {} has no training data. Call fit() before classifying.",
                    classifier
                )
            }
            KanjiError::MissingLabel { context } => {
                write!(f, "Missing label in {}", context)
            }
            KanjiError::InvalidConfiguration {
                parameter,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Invalid configuration for parameter '{}' with value '{}': {}",
                    parameter, value, reason
                )
            }
            KanjiError::DimensionMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {}: expected {}x{}, got {}x{}",
                    context, expected.0, expected.1, got.0, got.1
                )
            }
            KanjiError::Io { path, details } => {
                write!(f, "IO error reading '{}': {}", path, details)
            }
        }
    }
}

impl std::error::Error for KanjiError {}

// Convenience constructors for common error patterns
impl KanjiError {
    /// Create a decode error without line information
    pub fn decode(reason: impl Into<String>) -> Self {
        KanjiError::Decode {
            line: None,
            reason: reason.into(),
        }
    }

    /// Attach a 1-based line number to a decode error; other variants pass through
    pub fn at_line(self, line: usize) -> Self {
        match self {
            KanjiError::Decode { reason, .. } => KanjiError::Decode {
                line: Some(line),
                reason,
            },
            other => other,
        }
    }

    /// Create a degenerate distribution error
    pub fn degenerate_distribution(label: char, tokens: usize) -> Self {
        KanjiError::DegenerateDistribution { label, tokens }
    }

    /// Create an empty candidate set error
    pub fn empty_candidates(classifier: impl Into<String>) -> Self {
        KanjiError::EmptyCandidateSet {
            classifier: classifier.into(),
        }
    }

    /// Create a missing label error
    pub fn missing_label(context: impl Into<String>) -> Self {
        KanjiError::MissingLabel {
            context: context.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(
        parameter: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        KanjiError::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(
        expected: (usize, usize),
        got: (usize, usize),
        context: impl Into<String>,
    ) -> Self {
        KanjiError::DimensionMismatch {
            expected,
            got,
            context: context.into(),
        }
    }

    /// Wrap an IO failure for the given path
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        KanjiError::Io {
            path: path.into(),
            details: err.to_string(),
        }
    }

    /// Whether evaluation must abort instead of skipping the offending sample
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KanjiError::EmptyCandidateSet { .. } | KanjiError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_display_with_line() {
        let err = KanjiError::decode("odd number of coordinates").at_line(7);
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("odd number"));
    }

    #[test]
    fn test_at_line_leaves_other_variants() {
        let err = KanjiError::empty_candidates("knn").at_line(3);
        assert_eq!(err, KanjiError::empty_candidates("knn"));
    }

    #[test]
    fn test_degenerate_display() {
        let err = KanjiError::degenerate_distribution('木', 1);
        let msg = err.to_string();
        assert!(msg.contains('木'));
        assert!(msg.contains("1 token"));
    }

    #[test]
    fn test_empty_candidates_is_fatal() {
        assert!(KanjiError::empty_candidates("tree").is_fatal());
        assert!(!KanjiError::decode("bad").is_fatal());
        assert!(!KanjiError::degenerate_distribution('a', 0).is_fatal());
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = KanjiError::dimension_mismatch((400, 400), (2, 3), "pixel query");
        let msg = err.to_string();
        assert!(msg.contains("400x400"));
        assert!(msg.contains("2x3"));
        assert!(msg.contains("pixel query"));
    }

    #[test]
    fn test_io_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = KanjiError::io("corpus.txt", &io);
        assert!(err.to_string().contains("corpus.txt"));
    }
}
