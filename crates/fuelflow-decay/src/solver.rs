//! Dense matrix-exponential solver implementing [`TransmutationSolver`].
//!
//! Computes `exp(M) n0` by scaling and squaring: `M` is divided by `2^s`
//! until its 1-norm is at most [`THETA`], exponentiated with a truncated
//! Taylor series, then squared `s` times. Decay systems are small (tens of
//! nuclides), so a dense `n x n` workspace is cheap and keeps the result
//! deterministic.

use std::sync::{Arc, OnceLock};

use fuelflow_core::traits::{TransmutationSolver, TransmuteInfo};

use crate::library::DecayLibrary;

/// Norm bound for the scaled matrix fed to the Taylor series.
const THETA: f64 = 0.5;

/// Upper bound on Taylor terms; with `||A|| <= 0.5` the remainder after
/// 20 terms is far below double precision.
const MAX_TAYLOR_TERMS: usize = 20;

/// Squarings are capped so a pathological input cannot loop forever.
const MAX_SQUARINGS: u32 = 64;

/// Scaling-and-squaring solver over a fixed decay system.
#[derive(Debug, Clone)]
pub struct ExpmSolver {
    info: TransmuteInfo,
}

impl ExpmSolver {
    pub fn new(info: TransmuteInfo) -> Self {
        Self { info }
    }

    /// Solver over every nuclide in `library`.
    pub fn from_library(library: &DecayLibrary) -> Self {
        Self::new(library.transmute_info())
    }

    /// Expand the sparse entries into a row-major dense matrix.
    fn dense(&self, scaled_matrix: &[f64]) -> Vec<f64> {
        let n = self.info.n();
        let mut m = vec![0.0; n * n];
        for ((&r, &c), &v) in self.info.rows.iter().zip(&self.info.cols).zip(scaled_matrix) {
            m[r * n + c] += v;
        }
        m
    }
}

impl TransmutationSolver for ExpmSolver {
    fn info(&self) -> &TransmuteInfo {
        &self.info
    }

    fn solve(&self, scaled_matrix: &[f64], n0: &[f64]) -> Vec<f64> {
        let n = self.info.n();
        debug_assert_eq!(scaled_matrix.len(), self.info.nnz());
        debug_assert_eq!(n0.len(), n);
        if n == 0 {
            return Vec::new();
        }

        let mut state = vec![0.0; n];
        for (dst, src) in state.iter_mut().zip(n0) {
            *dst = *src;
        }

        let m = self.dense(scaled_matrix);
        let e = expm(&m, n);
        mat_vec(&e, &state, n)
    }
}

/// Process-wide solver over the built-in decay library, built on first use.
pub fn default_solver() -> Arc<dyn TransmutationSolver> {
    static DEFAULT: OnceLock<Arc<dyn TransmutationSolver>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(ExpmSolver::from_library(&DecayLibrary::builtin())))
        .clone()
}

/// Maximum absolute column sum.
fn norm1(a: &[f64], n: usize) -> f64 {
    (0..n)
        .map(|c| (0..n).map(|r| a[r * n + c].abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

fn identity(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}

fn mat_mul(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for k in 0..n {
            let aik = a[i * n + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += aik * b[k * n + j];
            }
        }
    }
    out
}

fn mat_vec(a: &[f64], v: &[f64], n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| (0..n).map(|j| a[i * n + j] * v[j]).sum())
        .collect()
}

/// Dense `exp(m)` by scaling and squaring.
fn expm(m: &[f64], n: usize) -> Vec<f64> {
    let norm = norm1(m, n);
    if norm == 0.0 {
        return identity(n);
    }

    let squarings = if norm > THETA {
        ((norm / THETA).log2().ceil() as u32).min(MAX_SQUARINGS)
    } else {
        0
    };
    let factor = 0.5_f64.powi(squarings as i32);
    let a: Vec<f64> = m.iter().map(|v| v * factor).collect();

    let mut result = identity(n);
    let mut term = identity(n);
    for k in 1..=MAX_TAYLOR_TERMS {
        term = mat_mul(&term, &a, n);
        let inv_k = 1.0 / k as f64;
        for v in term.iter_mut() {
            *v *= inv_k;
        }
        for (r, t) in result.iter_mut().zip(&term) {
            *r += t;
        }
        if norm1(&term, n) <= f64::EPSILON * norm1(&result, n) {
            break;
        }
    }

    for _ in 0..squarings {
        result = mat_mul(&result, &result, n);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::DecayEntry;
    use fuelflow_core::constants::SECS_PER_YEAR;
    use fuelflow_core::nuclide::Nuc;

    const CS137: Nuc = 551370000;
    const BA137: Nuc = 561370000;
    const SR90: Nuc = 380900000;
    const Y90: Nuc = 390900000;
    const ZR90: Nuc = 400900000;

    fn two_member() -> ExpmSolver {
        let lib = DecayLibrary::from_entries(vec![
            DecayEntry::stable(BA137),
            DecayEntry::radioactive(CS137, 30.08 * SECS_PER_YEAR, &[(BA137, 1.0)]),
        ])
        .unwrap();
        ExpmSolver::from_library(&lib)
    }

    fn run(solver: &ExpmSolver, t: f64, n0: &[f64]) -> Vec<f64> {
        let scaled = solver.info().scaled(-t);
        solver.solve(&scaled, n0)
    }

    #[test]
    fn zero_time_is_identity() {
        let s = two_member();
        assert_eq!(run(&s, 0.0, &[3.0, 5.0]), vec![3.0, 5.0]);
    }

    #[test]
    fn one_half_life_halves_parent() {
        let s = two_member();
        let cs = s.info().index_of(CS137).unwrap();
        let ba = s.info().index_of(BA137).unwrap();
        let mut n0 = vec![0.0; 2];
        n0[cs] = 1.0;
        let n1 = run(&s, 30.08 * SECS_PER_YEAR, &n0);
        assert!((n1[cs] - 0.5).abs() < 1e-12, "cs = {}", n1[cs]);
        assert!((n1[ba] - 0.5).abs() < 1e-12, "ba = {}", n1[ba]);
    }

    #[test]
    fn matches_analytic_exponential() {
        let s = two_member();
        let cs = s.info().index_of(CS137).unwrap();
        let lambda = std::f64::consts::LN_2 / (30.08 * SECS_PER_YEAR);
        let mut n0 = vec![0.0; 2];
        n0[cs] = 7.0;
        for years in [0.1, 1.0, 10.0, 100.0, 1000.0] {
            let t = years * SECS_PER_YEAR;
            let n1 = run(&s, t, &n0);
            let expected = 7.0 * (-lambda * t).exp();
            assert!(
                ((n1[cs] - expected) / expected).abs() < 1e-9,
                "t = {years} y: {} vs {expected}",
                n1[cs]
            );
        }
    }

    #[test]
    fn stiff_chain_conserves_atoms() {
        // Y-90 (64 h) under Sr-90 (28.8 y) over one month: short-lived
        // daughter, closed chain.
        let solver = default_solver();
        let info = solver.info();
        let mut n0 = vec![0.0; info.n()];
        n0[info.index_of(SR90).unwrap()] = 1.0;
        let n1 = solver.solve(&info.scaled(-2_629_846.0), &n0);

        let total: f64 = [SR90, Y90, ZR90]
            .iter()
            .map(|&nuc| n1[info.index_of(nuc).unwrap()])
            .sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert!(n1[info.index_of(Y90).unwrap()] > 0.0);
    }

    #[test]
    fn secular_equilibrium() {
        // After many daughter half-lives, lambda_p N_p ~= lambda_d N_d.
        let solver = default_solver();
        let info = solver.info();
        let mut n0 = vec![0.0; info.n()];
        n0[info.index_of(SR90).unwrap()] = 1.0;
        let n1 = solver.solve(&info.scaled(-60.0 * 86_400.0), &n0);

        let lib = DecayLibrary::builtin();
        let act_sr = lib.get(SR90).unwrap().decay_const() * n1[info.index_of(SR90).unwrap()];
        let act_y = lib.get(Y90).unwrap().decay_const() * n1[info.index_of(Y90).unwrap()];
        assert!(((act_y - act_sr) / act_sr).abs() < 1e-3);
    }

    #[test]
    fn deterministic() {
        let solver = default_solver();
        let info = solver.info();
        let n0: Vec<f64> = (0..info.n()).map(|i| i as f64 + 1.0).collect();
        let scaled = info.scaled(-1e9);
        assert_eq!(solver.solve(&scaled, &n0), solver.solve(&scaled, &n0));
    }

    #[test]
    fn empty_system() {
        let s = ExpmSolver::new(TransmuteInfo {
            nucids: vec![],
            rows: vec![],
            cols: vec![],
            decay_matrix: vec![],
        });
        assert!(s.solve(&[], &[]).is_empty());
    }

    #[test]
    fn default_solver_is_shared() {
        let a = default_solver();
        let b = default_solver();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.info().n(), DecayLibrary::builtin().len());
    }
}
