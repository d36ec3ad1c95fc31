//! Arithmetic over nuclide quantity vectors.
//!
//! A [`CompMap`] maps nuclide ids to non-negative quantities on either a
//! mass or an atom basis; the map itself does not record which.

use std::collections::BTreeMap;

use crate::nuclide::{self, Nuc};

/// Nuclide id to quantity, ordered by id.
pub type CompMap = BTreeMap<Nuc, f64>;

/// Whether every key is a valid nuclide id.
pub fn valid_nucs(v: &CompMap) -> bool {
    v.keys().all(|&nuc| nuclide::is_nuclide(nuc))
}

/// Whether every quantity is strictly positive.
pub fn all_positive(v: &CompMap) -> bool {
    v.values().all(|&q| q > 0.0)
}

/// Sum of all quantities.
pub fn sum(v: &CompMap) -> f64 {
    v.values().sum()
}

/// Scale `v` in place so that its quantities sum to `target`.
/// A zero-sum vector is left untouched.
pub fn normalize(v: &mut CompMap, target: f64) {
    let total = sum(v);
    if total == 0.0 {
        return;
    }
    let factor = target / total;
    for q in v.values_mut() {
        *q *= factor;
    }
}

/// Multiply every quantity by `factor`.
pub fn scale(v: &CompMap, factor: f64) -> CompMap {
    v.iter().map(|(&nuc, &q)| (nuc, q * factor)).collect()
}

/// Element-wise sum.
pub fn add(a: &CompMap, b: &CompMap) -> CompMap {
    let mut out = a.clone();
    for (&nuc, &q) in b {
        *out.entry(nuc).or_insert(0.0) += q;
    }
    out
}

/// Element-wise difference; entries that end up at or below zero are
/// dropped.
pub fn sub(a: &CompMap, b: &CompMap) -> CompMap {
    let mut out = a.clone();
    for (&nuc, &q) in b {
        *out.entry(nuc).or_insert(0.0) -= q;
    }
    out.retain(|_, q| *q > 0.0);
    out
}

/// Convert a mass-basis vector to atom basis (divide by atomic mass).
pub fn mass_to_atom(mass: &CompMap) -> CompMap {
    mass.iter()
        .map(|(&nuc, &q)| (nuc, q / nuclide::atomic_mass(nuc)))
        .collect()
}

/// Convert an atom-basis vector to mass basis (multiply by atomic mass).
pub fn atom_to_mass(atom: &CompMap) -> CompMap {
    atom.iter()
        .map(|(&nuc, &q)| (nuc, q * nuclide::atomic_mass(nuc)))
        .collect()
}

/// Whether both vectors hold the same nuclides with quantities equal
/// within relative tolerance `rel`. Missing entries count as zero.
pub fn almost_eq(a: &CompMap, b: &CompMap, rel: f64) -> bool {
    let close = |x: f64, y: f64| {
        let scale = x.abs().max(y.abs());
        scale == 0.0 || (x - y).abs() <= rel * scale
    };
    a.iter().all(|(nuc, &x)| close(x, b.get(nuc).copied().unwrap_or(0.0)))
        && b.iter().all(|(nuc, &y)| close(a.get(nuc).copied().unwrap_or(0.0), y))
}
