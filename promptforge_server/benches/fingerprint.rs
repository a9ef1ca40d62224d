use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use promptforge_server::domains::cache::fingerprint;
use serde_json::json;
use std::time::Duration;

fn benchmark_fingerprint_short_text(c: &mut Criterion) {
  c.bench_function("fingerprint_short_text", |b| {
    b.iter(|| {
      let fp = fingerprint::fingerprint(
        black_box("Explain quantum computing to a beginner"),
        black_box(&["chain_of_thought".to_string()]),
        None,
        None,
      );
      black_box(fp);
    })
  });
}

fn benchmark_fingerprint_with_context(c: &mut Criterion) {
  let context = json!({
    "domain": "physics",
    "audience": "beginner",
    "tone": "friendly",
    "prior_turns": 3,
  });

  c.bench_function("fingerprint_with_context", |b| {
    b.iter(|| {
      let fp = fingerprint::fingerprint(
        black_box("Explain quantum computing to a beginner"),
        black_box(&["chain_of_thought".to_string(), "few_shot".to_string()]),
        Some(black_box(&context)),
        Some(black_box("moderate")),
      );
      black_box(fp);
    })
  });
}

fn benchmark_fingerprint_by_text_length(c: &mut Criterion) {
  let mut group = c.benchmark_group("fingerprint_by_text_length");

  for size in [32, 256, 2048].iter() {
    let text: String = "word ".repeat(*size / 5);

    group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
      b.iter(|| {
        let fp = fingerprint::fingerprint(black_box(text), &[], None, None);
        black_box(fp);
      })
    });
  }

  group.finish();
}

fn benchmark_normalize_text(c: &mut Criterion) {
  c.bench_function("normalize_text", |b| {
    b.iter(|| {
      let normalized = fingerprint::normalize_text(black_box(
        "Explain   quantum  computing\u{00A0}to   a beginner\n\nplease",
      ));
      black_box(normalized);
    })
  });
}

criterion_group! {
  name = benches;
  config = Criterion::default()
    .sample_size(100)
    .measurement_time(Duration::from_secs(10));
  targets = benchmark_fingerprint_short_text, benchmark_fingerprint_with_context,
    benchmark_fingerprint_by_text_length, benchmark_normalize_text
}

criterion_main!(benches);
