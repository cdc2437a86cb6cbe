use kanji_recognition_core::{
    EvaluationHarness, FeatureVector, FeatureWeights, GaussianClassifier, GaussianConfig,
    KnnConfig, NearestNeighbor, SearchConfig, StrokeClassifier, StrokeDataset,
    StrokeDatasetConfig, WeightSearch,
};

fn split() -> (Vec<FeatureVector>, Vec<FeatureVector>) {
    StrokeDataset::generate(StrokeDatasetConfig {
        labels: "一二三十木日".chars().collect(),
        samples_per_label: 6,
        jitter: 25,
        seed: 7,
        ..Default::default()
    })
    .unwrap()
    .stratified_split(0.5)
}

fn small_search() -> SearchConfig {
    SearchConfig {
        max_evaluations: 60,
        max_depth: 6,
        ..SearchConfig::default()
    }
}

#[test]
fn tuning_never_falls_below_baseline() {
    let (train, test) = split();
    let harness = EvaluationHarness::new(train, test.into_iter().map(Ok).collect());

    let mut knn = NearestNeighbor::new(KnnConfig {
        k: 1,
        weights: FeatureWeights::DISTANCES_ONLY,
    })
    .unwrap();
    let mut search = WeightSearch::new(small_search()).unwrap();
    let outcome = harness.tune(&mut knn, &mut search).unwrap();

    assert!(outcome.best_score >= outcome.baseline);
    assert!(outcome.evaluations <= 60);
    assert_eq!(knn.weights(), outcome.best_weights);
    assert_eq!(search.score_of(&outcome.best_weights), Some(outcome.best_score));
}

#[test]
fn repeated_tuning_reuses_memo() {
    let (train, test) = split();
    let test: Vec<_> = test.into_iter().map(Ok).collect();

    let mut gaussian = GaussianClassifier::new(GaussianConfig::default()).unwrap();
    gaussian.fit(&train).unwrap();
    let start = gaussian.weights();

    let mut search = WeightSearch::new(small_search()).unwrap();
    let first = search.tune(&mut gaussian, &test).unwrap();
    let memo = search.memo_len();

    gaussian.set_weights(start).unwrap();
    let second = search.tune(&mut gaussian, &test).unwrap();

    assert_eq!(second.best_weights, first.best_weights);
    assert_eq!(second.best_score, first.best_score);
    assert_eq!(second.evaluations, 0);
    assert_eq!(search.memo_len(), memo);
}

#[test]
fn search_with_constant_score_only_visits_first_level() {
    let mut search = WeightSearch::new(SearchConfig::default()).unwrap();
    let mut calls = 0;
    let outcome = search
        .search(FeatureWeights::UNIFORM, 4, |_| {
            calls += 1;
            Ok(4)
        })
        .unwrap();
    assert_eq!(calls, 5);
    assert!(!outcome.improved());
    assert_eq!(outcome.best_weights, FeatureWeights::UNIFORM);
}
