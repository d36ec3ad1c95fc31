//! Criterion benchmarks for fuelflow-core hot paths.
//!
//! Covers: nuclide name parsing, basis conversion, and normalization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fuelflow_core::comp_math::{self, CompMap};
use fuelflow_core::nuclide;

/// A spent-fuel-like vector over every Z with a plausible A.
fn sample_vector() -> CompMap {
    (1..=100)
        .map(|z| (nuclide::id(z, 2 * z + 10, 0), z as f64 * 0.37))
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("nuclide_parse", |b| {
        b.iter(|| nuclide::parse(black_box("Pu-239")))
    });
}

fn bench_mass_to_atom(c: &mut Criterion) {
    let v = sample_vector();
    c.bench_function("mass_to_atom_100", |b| {
        b.iter(|| comp_math::mass_to_atom(black_box(&v)))
    });
}

fn bench_normalize(c: &mut Criterion) {
    let v = sample_vector();
    c.bench_function("normalize_100", |b| {
        b.iter(|| {
            let mut w = v.clone();
            comp_math::normalize(black_box(&mut w), 1.0);
            w
        })
    });
}

criterion_group!(benches, bench_parse, bench_mass_to_atom, bench_normalize);
criterion_main!(benches);
