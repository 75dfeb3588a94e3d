//! Criterion benchmarks for the symmetry engine.
//! Focus: canonical keys and minimal images of nets given in supercells.
//! Results: by default under target/criterion.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use systre::pgraph::PeriodicGraph;

const NETS: [(&str, &str); 4] = [
    ("pcu", "3 1 1 -1 0 0 1 1 0 -1 0 1 1 0 0 -1"),
    ("dia", "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0"),
    ("srs", "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 3 0 1 0 2 4 1 0 0 3 4 0 0 1"),
    ("cds", "3 1 1 -1 0 0 1 2 0 0 0 1 2 0 1 0 2 2 0 0 -1"),
];

/// The net of `key` in a `k×1×1` supercell with shuffled node numbers.
fn supercell(key: &str, k: usize, seed: u64) -> PeriodicGraph {
    let g = PeriodicGraph::from_key(key).expect("valid key");
    let n = g.number_of_nodes();
    let mut perm: Vec<usize> = (0..n * k).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..perm.len()).rev() {
        perm.swap(i, rng.gen_range(0..=i));
    }
    let mut edges = Vec::new();
    for e in g.edge_ids() {
        let de = systre::pgraph::DirEdge::forward(e);
        let (v, w) = (g.source(de).0, g.target(de).0);
        let s: Vec<i64> = g
            .shift(de)
            .iter()
            .map(|x| systre::arith::to_i64(x).expect("integral shift"))
            .collect();
        for i in 0..k as i64 {
            let j = i + s[0];
            let layer = j.rem_euclid(k as i64);
            let shift = vec![j.div_euclid(k as i64), s[1], s[2]];
            edges.push((
                perm[v + n * i as usize],
                perm[w + n * layer as usize],
                shift,
            ));
        }
    }
    PeriodicGraph::from_edges(3, n * k, &edges).expect("valid supercell")
}

fn bench_invariant(c: &mut Criterion) {
    let mut group = c.benchmark_group("invariant");
    group.sample_size(20);
    for (name, key) in NETS {
        group.bench_with_input(BenchmarkId::new("systre_key", name), &key, |b, key| {
            b.iter_batched(
                || PeriodicGraph::from_key(key).expect("valid key"),
                |g| {
                    let _k = g.systre_key().expect("key");
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("minimal_image_x3", name), &key, |b, key| {
            b.iter_batched(
                || supercell(key, 3, 7),
                |g| {
                    let _m = g.minimal_image().expect("minimal image");
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_invariant);
criterion_main!(benches);
