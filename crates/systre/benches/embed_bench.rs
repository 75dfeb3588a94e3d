//! Criterion benchmarks for the embedder.
//! Focus: parameter-space setup and a short relaxation for small nets.
//! Results: by default under target/criterion.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use systre::embed::{EmbedCfg, Embedder};
use systre::pgraph::PeriodicGraph;

const NETS: [(&str, &str); 3] = [
    ("dia", "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0"),
    ("srs", "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 3 0 1 0 2 4 1 0 0 3 4 0 0 1"),
    ("cds", "3 1 1 -1 0 0 1 2 0 0 0 1 2 0 1 0 2 2 0 0 -1"),
];

fn bench_embed(c: &mut Criterion) {
    let cfg = EmbedCfg {
        passes: 1,
        restarts: 2,
        ..EmbedCfg::default()
    };
    let mut group = c.benchmark_group("embed");
    group.sample_size(10);
    for (name, key) in NETS {
        let g = PeriodicGraph::from_key(key).expect("valid key");
        // symmetries are memoized per graph; warm them up outside the timing
        g.symmetry_operators().expect("symmetries");

        group.bench_with_input(BenchmarkId::new("setup", name), &g, |b, g| {
            b.iter(|| Embedder::new(g, cfg).expect("embedder"))
        });
        group.bench_with_input(BenchmarkId::new("relax_200", name), &g, |b, g| {
            b.iter_batched(
                || Embedder::new(g, cfg).expect("embedder"),
                |mut emb| {
                    emb.go(200);
                    emb.normalize().expect("normalize");
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_embed);
criterion_main!(benches);
