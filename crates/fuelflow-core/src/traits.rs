//! Trait interfaces for the Fuelflow core.
//!
//! These traits define the contracts between crates:
//! - [`TransmutationSolver`]: matrix-exponential decay solve (fuelflow-decay implements)
//! - [`Recorder`]: output data sink (in-memory and JSON-lines sinks in [`crate::recorder`])

use crate::nuclide::Nuc;
use crate::recorder::Datum;

/// Sparsity pattern and rates of the decay system a solver integrates.
///
/// The matrix is stored in coordinate form. `decay_matrix[k]` is the entry at
/// `(rows[k], cols[k])`, with `+lambda` on the diagonal and
/// `-branch * lambda_parent` at `(daughter, parent)`, so that
/// `dN/dt = -D N`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmuteInfo {
    /// Tracked nuclides, sorted ascending. Position is the state-vector index.
    pub nucids: Vec<Nuc>,
    /// Row index of each stored entry.
    pub rows: Vec<usize>,
    /// Column index of each stored entry.
    pub cols: Vec<usize>,
    /// Decay-rate values in 1/s.
    pub decay_matrix: Vec<f64>,
}

impl TransmuteInfo {
    /// Length of the state vector.
    pub fn n(&self) -> usize {
        self.nucids.len()
    }

    /// Number of stored matrix entries.
    pub fn nnz(&self) -> usize {
        self.decay_matrix.len()
    }

    /// State-vector index of `nuc`, or `None` if the solver does not track it.
    pub fn index_of(&self, nuc: Nuc) -> Option<usize> {
        self.nucids.binary_search(&nuc).ok()
    }

    /// Decay matrix scaled by `factor`, in the same sparse layout.
    pub fn scaled(&self, factor: f64) -> Vec<f64> {
        self.decay_matrix.iter().map(|v| v * factor).collect()
    }
}

/// Computes the action of a matrix exponential on an atom-quantity vector.
///
/// Implementations are deterministic, pure functions of their inputs.
/// Implemented by the dense solver in fuelflow-decay.
pub trait TransmutationSolver: Send + Sync {
    /// The decay system this solver integrates.
    fn info(&self) -> &TransmuteInfo;

    /// Compute `exp(M) n0` where `M` is given by `scaled_matrix` in the
    /// sparse layout of [`info`](Self::info).
    ///
    /// `scaled_matrix.len()` must equal `info().nnz()` and `n0.len()` must
    /// equal `info().n()`.
    fn solve(&self, scaled_matrix: &[f64], n0: &[f64]) -> Vec<f64>;

    /// State-vector index of `nuc`.
    ///
    /// Default implementation delegates to [`TransmuteInfo::index_of`].
    fn index_of(&self, nuc: Nuc) -> Option<usize> {
        self.info().index_of(nuc)
    }
}

/// Sink for output rows.
///
/// Recording is fire-and-forget from the caller's point of view; sinks that
/// can fail (files) report failures through their own flush path.
pub trait Recorder: Send + Sync {
    /// Accept one committed row.
    fn record(&self, datum: Datum);
}
