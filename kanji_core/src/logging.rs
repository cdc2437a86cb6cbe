use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::classifier::LabelTally;
use crate::evaluation::EvaluationReport;
use crate::metric::FeatureWeights;
use crate::optimizer::SearchOutcome;

pub const EVALUATION_LOG: &str = "evaluation.jsonl";
pub const WEIGHT_SEARCH_LOG: &str = "weight_search.jsonl";

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[derive(Debug, Serialize)]
pub struct EvaluationLogEntry<'a> {
    pub classifier: &'a str,
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub accuracy: f32,
    pub weights: FeatureWeights,
    pub per_label: Vec<(char, LabelTally)>,
    pub elapsed_ms: u128,
    pub timestamp_ms: u128,
}

pub fn log_evaluation<P: AsRef<Path>>(dir: P, report: &EvaluationReport) -> io::Result<()> {
    fs::create_dir_all(&dir)?;
    let entry = EvaluationLogEntry {
        classifier: &report.classifier,
        correct: report.tally.correct,
        incorrect: report.tally.incorrect,
        skipped: report.tally.skipped,
        accuracy: report.accuracy(),
        weights: report.weights,
        per_label: report
            .tally
            .per_label
            .iter()
            .map(|(label, tally)| (*label, *tally))
            .collect(),
        elapsed_ms: report.elapsed_ms,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line(dir.as_ref().join(EVALUATION_LOG), &entry)
}

#[derive(Debug, Serialize)]
pub struct SearchLogEntry<'a> {
    pub classifier: &'a str,
    pub baseline: usize,
    pub best_score: usize,
    pub best_weights: FeatureWeights,
    pub evaluations: usize,
    pub memo_hits: usize,
    pub budget_exhausted: bool,
    pub timestamp_ms: u128,
}

pub fn log_search<P: AsRef<Path>>(
    dir: P,
    classifier: &str,
    outcome: &SearchOutcome,
) -> io::Result<()> {
    fs::create_dir_all(&dir)?;
    let entry = SearchLogEntry {
        classifier,
        baseline: outcome.baseline,
        best_score: outcome.best_score,
        best_weights: outcome.best_weights,
        evaluations: outcome.evaluations,
        memo_hits: outcome.memo_hits,
        budget_exhausted: outcome.budget_exhausted,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line(dir.as_ref().join(WEIGHT_SEARCH_LOG), &entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Tally;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("kanji-logging-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_evaluation_lines_append() {
        let dir = scratch_dir("eval");
        let mut tally = Tally::default();
        tally.record('木', '木');
        tally.record('木', '本');
        let report = EvaluationReport {
            classifier: "knn".into(),
            weights: FeatureWeights::UNIFORM,
            tally,
            elapsed_ms: 3,
        };
        log_evaluation(&dir, &report).unwrap();
        log_evaluation(&dir, &report).unwrap();

        let contents = fs::read_to_string(dir.join(EVALUATION_LOG)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["correct"], 1);
        assert_eq!(parsed["incorrect"], 1);
        assert_eq!(parsed["per_label"][0][0], "木");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_search_line_written() {
        let dir = scratch_dir("search");
        let outcome = SearchOutcome {
            best_weights: FeatureWeights::PLACEMENT,
            best_score: 9,
            baseline: 6,
            evaluations: 14,
            memo_hits: 3,
            budget_exhausted: false,
        };
        log_search(&dir, "gaussian-zscore", &outcome).unwrap();
        let contents = fs::read_to_string(dir.join(WEIGHT_SEARCH_LOG)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["best_score"], 9);
        assert_eq!(parsed["best_weights"]["distances"], 12.0);
        let _ = fs::remove_dir_all(&dir);
    }
}
