//! Selection benchmarks
//!
//! Resolve is `O(runs x steps)` per tap; these confirm it stays far below
//! interaction latency at realistic catalog sizes.
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use soup_scope::catalog::{DerivedSeries, SeriesCatalog};
use soup_scope::config::ExplorerConfig;
use soup_scope::experiment::RunId;
use soup_scope::render::{HeadlessChart, RenderSurface};
use soup_scope::selection::resolve;

fn catalog(runs: u64, steps: usize) -> SeriesCatalog {
    (1..=runs)
        .map(|id| {
            (
                RunId::new(id).unwrap(),
                DerivedSeries::from_expressions(vec!["ab"; steps + id as usize]),
            )
        })
        .collect()
}

/// Benchmark resolve over growing catalogs
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for runs in [3, 30, 300] {
        let catalog = catalog(runs, 100);
        let visible: Vec<RunId> = catalog.run_ids().collect();
        group.bench_with_input(BenchmarkId::from_parameter(runs), &runs, |b, _| {
            b.iter(|| black_box(resolve(&catalog, visible.iter().copied(), black_box(57.3))));
        });
    }

    group.finish();
}

/// Benchmark a full tap: resolve plus detail rebind
fn bench_tap(c: &mut Criterion) {
    let mut surface =
        RenderSurface::new(HeadlessChart::new(), &ExplorerConfig::default(), catalog(30, 1_000))
            .unwrap();
    let mut x = 0.0;
    c.bench_function("tap_30_runs", |b| {
        b.iter(|| {
            x = (x + 7.0) % 1_030.0;
            black_box(surface.on_tap(x).unwrap());
        });
    });
}

criterion_group!(benches, bench_resolve, bench_tap);
criterion_main!(benches);
