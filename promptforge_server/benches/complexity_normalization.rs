use criterion::{black_box, criterion_group, criterion_main, Criterion};
use promptforge_server::domains::orchestration::complexity;
use std::time::Duration;

const LABELS: &[&str] = &[
  "low", "easy", "basic", "simple", "medium", "intermediate", "moderate", "high", "hard",
  "difficult", "advanced", "complex", "unknown_label",
];

fn benchmark_normalize_single(c: &mut Criterion) {
  c.bench_function("complexity_normalize_single", |b| {
    b.iter(|| {
      let label = complexity::normalize(black_box("Intermediate"));
      black_box(label);
    })
  });
}

fn benchmark_normalize_mixed_labels(c: &mut Criterion) {
  c.bench_function("complexity_normalize_mixed_labels", |b| {
    b.iter(|| {
      for label in LABELS {
        black_box(complexity::normalize(black_box(label)));
      }
    })
  });
}

criterion_group! {
  name = benches;
  config = Criterion::default()
    .sample_size(100)
    .measurement_time(Duration::from_secs(10));
  targets = benchmark_normalize_single, benchmark_normalize_mixed_labels
}

criterion_main!(benches);
