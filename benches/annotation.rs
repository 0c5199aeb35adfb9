//! Benchmark for anchor extraction and full annotation passes

use acoustic_modeller::phonology::LocaleFeatureResolver;
use acoustic_modeller::timing::{compute_timings, RoundingMode};
use acoustic_modeller::{AcousticModeller, AnchorExtractor, Config, MarkupTree, NodeSpec};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Document with `n` three-phone syllables and a boundary every fifth
fn utterance(n: usize) -> MarkupTree {
    let inventory = [["k", "{", "t"], ["s", "I", "n"], ["d", "O", "g"], ["p", "s", "t"]];
    let children = (0..n)
        .flat_map(|i| {
            let phones = inventory[i % inventory.len()]
                .iter()
                .map(|p| NodeSpec::phone(p))
                .collect();
            let mut nodes = vec![NodeSpec::syllable(phones)];
            if i % 5 == 4 {
                nodes.push(NodeSpec::boundary(3));
            }
            nodes
        })
        .collect();
    MarkupTree::from_spec(&NodeSpec::document("en-US", children))
}

fn bench_extraction(c: &mut Criterion) {
    let resolver = LocaleFeatureResolver::with_builtin_sets();
    let tree = utterance(1000);

    c.bench_function("extract_anchors_1000_syllables", |b| {
        b.iter(|| AnchorExtractor::new(&resolver).extract(black_box(&tree)))
    });
}

fn bench_timing(c: &mut Criterion) {
    let seconds: Vec<f64> = (0..3000).map(|i| 0.04 + (i % 7) as f64 * 0.0125).collect();

    c.bench_function("compute_timings_3000", |b| {
        b.iter(|| compute_timings(black_box(&seconds), RoundingMode::HalfAwayFromZero))
    });
}

fn bench_process(c: &mut Criterion) {
    let config = Config::with_builtin_voices();
    let Ok(modeller) = AcousticModeller::from_config(&config) else {
        return;
    };
    let tree = utterance(200);

    c.bench_function("process_200_syllables", |b| {
        b.iter(|| modeller.process(black_box(tree.clone()), None))
    });
}

criterion_group!(benches, bench_extraction, bench_timing, bench_process);
criterion_main!(benches);
