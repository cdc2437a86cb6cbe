//! Evaluate every stroke classifier on a synthetic or collected dataset.
//!
//! Usage:
//!   cargo run --example evaluate_classifiers [engine.toml] [collected.txt]
//!
//! Without a collected file the run uses a seeded synthetic dataset. Logs
//! are appended under `logs/`.

use kanji_recognition_core::data::load_collected;
use kanji_recognition_core::{
    ClusterTree, EngineConfig, EvaluationHarness, EvaluationReport, FeatureFamily,
    FeatureRanges, FeatureVector, GaussianClassifier, GaussianScoring, KanjiResult,
    NearestNeighbor, StrokeDataset, StrokeDatasetConfig, WeightSearch,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("✍️  Kanji Stroke Classifier Evaluation");
    println!("=====================================\n");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => {
            println!("Loading configuration from {}", path);
            EngineConfig::load_from_file(path)?
        }
        None => EngineConfig::default(),
    };

    println!("Configuration:");
    println!("  kNN k: {}", config.knn.k);
    println!("  Tree k: {}", config.tree.k);
    println!("  Tree max iterations: {}", config.tree.max_iterations);
    println!("  Search budget: {}", config.search.max_evaluations);
    println!();

    println!("📊 Loading samples...");
    let (training, test) = match args.get(1) {
        Some(path) => split_collected(load_collected(path)?),
        None => {
            let dataset = StrokeDataset::generate(StrokeDatasetConfig::default())?;
            let (train, test) = dataset.stratified_split(0.7);
            (train, test.into_iter().map(Ok).collect())
        }
    };
    println!("  Training samples: {}", training.len());
    println!("  Test samples: {}", test.len());
    println!(
        "  Malformed test samples: {}",
        test.iter().filter(|s| s.is_err()).count()
    );
    println!();

    if let Some(ranges) = FeatureRanges::observe(&training) {
        println!("📐 Training feature ranges:");
        for family in FeatureFamily::ALL {
            let range = ranges.family(family);
            println!(
                "  {:<10} [{:>9.2}, {:>9.2}]",
                range.family.as_str(),
                range.min,
                range.max
            );
        }
        println!();
    }

    std::fs::create_dir_all("logs")?;
    let harness = EvaluationHarness::new(training, test).with_log_dir("logs");

    println!("🔎 Running classifiers...");
    let mut knn = NearestNeighbor::new(config.knn.clone())?;
    print_report(&harness.run(&mut knn)?);

    let mut gaussian = GaussianClassifier::new(config.gaussian.clone())?;
    let report = harness.run(&mut gaussian)?;
    print_report(&report);
    let other = match config.gaussian.scoring {
        GaussianScoring::ZScore => ("gaussian-distance", gaussian.distance_tally()),
        GaussianScoring::Distance => ("gaussian-zscore", gaussian.z_score_tally()),
    };
    println!(
        "  {:<18} {:>6.2}%  (same pass)",
        other.0,
        other.1.accuracy() * 100.0
    );

    let mut tree = ClusterTree::new(config.tree.clone())?;
    print_report(&harness.run(&mut tree)?);
    println!();

    println!("🌳 Cluster tree:");
    print!("{}", tree.summary());
    for warning in tree.warnings().iter().take(5) {
        println!("  ⚠️  {}", warning);
    }
    println!();

    println!("⚖️  Tuning kNN weights...");
    let mut search = WeightSearch::new(config.search.clone())?;
    let outcome = harness.tune(&mut knn, &mut search)?;
    println!("  Baseline correct: {}", outcome.baseline);
    println!("  Best correct: {}", outcome.best_score);
    println!("  Best weights: {:?}", outcome.best_weights);
    println!(
        "  Evaluations: {} (memo hits: {})",
        outcome.evaluations, outcome.memo_hits
    );
    if outcome.budget_exhausted {
        println!("  Evaluation budget exhausted before the frontier emptied");
    }

    println!("\n✅ Evaluation complete! Logs written to logs/");
    Ok(())
}

/// Every fifth well-formed sample is held out; malformed lines go to the test set.
fn split_collected(
    samples: Vec<KanjiResult<FeatureVector>>,
) -> (Vec<FeatureVector>, Vec<KanjiResult<FeatureVector>>) {
    let mut training = Vec::new();
    let mut test = Vec::new();
    for (i, sample) in samples.into_iter().enumerate() {
        match sample {
            Ok(vector) if i % 5 != 0 => training.push(vector),
            other => test.push(other),
        }
    }
    (training, test)
}

fn print_report(report: &EvaluationReport) {
    println!(
        "  {:<18} {:>6.2}%  ({} correct, {} incorrect, {} skipped, {} ms)",
        report.classifier,
        report.accuracy() * 100.0,
        report.tally.correct,
        report.tally.incorrect,
        report.tally.skipped,
        report.elapsed_ms
    );
}
