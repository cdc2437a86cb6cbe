//! Collected-sample text format.
//!
//! One sample per line: a glyph name followed by its bracketed reduced-stroke
//! array, e.g. `木 [10, 50, 90, 50, 50, 10, 50, 95, ...]`. The label is the
//! first character of the name. Blank lines and `#` comments are ignored.
//! Malformed lines come back as errors carrying their line number so callers
//! can skip them individually.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{KanjiError, KanjiResult};
use crate::features::{FeatureVector, StrokeExtractor};

/// Parse one collected line.
pub fn parse_line(line: &str) -> KanjiResult<FeatureVector> {
    let line = line.trim();
    let open = line
        .find('[')
        .ok_or_else(|| KanjiError::decode("missing '[' before stroke values"))?;
    let close = line
        .rfind(']')
        .filter(|&close| close > open)
        .ok_or_else(|| KanjiError::decode("missing ']' after stroke values"))?;
    if !line[close + 1..].trim().is_empty() {
        return Err(KanjiError::decode("unexpected text after ']'"));
    }

    let label = line[..open]
        .trim()
        .chars()
        .next()
        .ok_or_else(|| KanjiError::decode("missing glyph label"))?;

    let body = line[open + 1..close].trim();
    let values = if body.is_empty() {
        Vec::new()
    } else {
        body.split(',')
            .map(|token| {
                let token = token.trim();
                token
                    .parse::<i32>()
                    .map_err(|_| KanjiError::decode(format!("'{}' is not an integer", token)))
            })
            .collect::<KanjiResult<Vec<i32>>>()?
    };

    StrokeExtractor::new().from_reduced(label, &values)
}

/// Parse every non-blank, non-comment line of `reader`.
pub fn read_collected<R: BufRead>(reader: R) -> Vec<KanjiResult<FeatureVector>> {
    let mut samples = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                samples.push(Err(KanjiError::decode(err.to_string()).at_line(number)));
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        samples.push(parse_line(trimmed).map_err(|err| err.at_line(number)));
    }
    debug!(
        samples = samples.len(),
        malformed = samples.iter().filter(|s| s.is_err()).count(),
        "read collected samples"
    );
    samples
}

/// Open and parse a collected-sample file.
pub fn load_collected<P: AsRef<Path>>(path: P) -> KanjiResult<Vec<KanjiResult<FeatureVector>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| KanjiError::io(path.display().to_string(), &err))?;
    Ok(read_collected(BufReader::new(file)))
}

/// Format a sample back into a collected line.
pub fn format_line(sample: &FeatureVector) -> Option<String> {
    let label = sample.label()?;
    let values: Vec<String> = sample
        .reduced_scalars()
        .iter()
        .map(i32::to_string)
        .collect();
    Some(format!("{} [{}]", label, values.join(", ")))
}
