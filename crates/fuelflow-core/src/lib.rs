//! # fuelflow-core
//! Foundation types and traits for the Fuelflow simulation core.

pub mod comp_math;
pub mod constants;
pub mod error;
pub mod nuclide;
pub mod recorder;
pub mod traits;

pub use comp_math::CompMap;
pub use nuclide::Nuc;
