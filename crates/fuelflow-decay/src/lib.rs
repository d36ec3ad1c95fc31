//! # fuelflow-decay: Compositions and radioactive decay.
//!
//! - **Compositions**: immutable nuclide vectors with lazily derived
//!   mass/atom bases and process-unique ids.
//! - **Decay lineages**: every composition decayed from a common root shares
//!   one cache keyed by cumulative timestep offset, so equal projections are
//!   the same composition.
//! - **Decay library**: built-in half-lives and branching ratios for the
//!   actinide and fission-product chains the simulator tracks.
//! - **Solver**: dense matrix exponential by scaling and squaring, shared
//!   process-wide through [`default_solver`].

pub mod composition;
pub mod library;
pub mod solver;

pub use composition::{Basis, Composition, DecayChain};
pub use library::{DecayEntry, DecayLibrary};
pub use solver::{default_solver, ExpmSolver};
