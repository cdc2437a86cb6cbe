//! Performance benchmarks for extraction and classification
//!
//! Run with: cargo bench --bench classifier_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kanji_recognition_core::data::render_stream;
use kanji_recognition_core::{
    ClusterTree, FeatureVector, GaussianClassifier, GaussianConfig, KnnConfig, NearestNeighbor,
    StrokeClassifier, StrokeDataset, StrokeDatasetConfig, StrokeExtractor, TreeConfig,
};

fn dataset(samples_per_label: usize) -> Vec<FeatureVector> {
    StrokeDataset::generate(StrokeDatasetConfig {
        samples_per_label,
        max_strokes: 16,
        ..Default::default()
    })
    .expect("synthetic dataset")
    .samples
}

/// Benchmark stream decoding and feature derivation
fn bench_extraction(c: &mut Criterion) {
    let dataset = StrokeDataset::generate(StrokeDatasetConfig {
        max_strokes: 30,
        ..Default::default()
    })
    .expect("synthetic dataset");
    let extractor = StrokeExtractor::new();
    let streams: Vec<Vec<i32>> = dataset
        .templates
        .iter()
        .map(|t| render_stream(&t.strokes))
        .collect();

    c.bench_function("extract_streams", |b| {
        b.iter(|| {
            for stream in &streams {
                black_box(extractor.extract(None, stream).expect("valid stream"));
            }
        });
    });
}

/// Benchmark kNN prediction as the candidate set grows
fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_predict");

    for per_label in [10, 50, 200].iter() {
        let samples = dataset(*per_label);
        let query = samples[0].clone();
        let mut knn = NearestNeighbor::new(KnnConfig::default()).expect("valid config");
        knn.fit(&samples).expect("labeled samples");

        group.bench_with_input(BenchmarkId::from_parameter(samples.len()), &query, |b, q| {
            b.iter(|| black_box(knn.predict(q).expect("non-empty candidates")));
        });
    }

    group.finish();
}

/// Benchmark Gaussian scoring against every label
fn bench_gaussian(c: &mut Criterion) {
    let samples = dataset(50);
    let query = samples[0].clone();
    let mut gaussian = GaussianClassifier::new(GaussianConfig::default()).expect("valid config");
    gaussian.fit(&samples).expect("labeled samples");

    c.bench_function("gaussian_score", |b| {
        b.iter(|| black_box(gaussian.score(&query).expect("non-empty model")));
    });
}

/// Benchmark cluster tree growth
fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    group.sample_size(20);

    for per_label in [10, 50].iter() {
        let samples = dataset(*per_label);
        group.bench_with_input(
            BenchmarkId::from_parameter(samples.len()),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let mut tree = ClusterTree::new(TreeConfig::default()).expect("valid config");
                    tree.fit(samples).expect("labeled samples");
                    black_box(tree.summary())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_knn,
    bench_gaussian,
    bench_tree_build
);
criterion_main!(benches);
