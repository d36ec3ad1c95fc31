//! Error types for the Fuelflow core.
use thiserror::Error;

use crate::nuclide::Nuc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NuclideError {
    #[error("unknown nuclide name: {0}")] UnknownName(String),
    #[error("invalid nuclide id: {0}")] InvalidId(Nuc),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("invalid nuclide in composition: {0}")] InvalidNuclide(Nuc),
    #[error("non-positive quantity {qty} for nuclide {nuc}")] NonPositiveQuantity { nuc: Nuc, qty: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecayLibraryError {
    #[error("duplicate library entry: {0}")] Duplicate(Nuc),
    #[error("invalid nuclide in library: {0}")] InvalidNuclide(Nuc),
    #[error("non-positive half-life {half_life} for {nuc}")] NonPositiveHalfLife { nuc: Nuc, half_life: f64 },
    #[error("daughter {daughter} of {parent} is not in the library")] UnknownDaughter { parent: Nuc, daughter: Nuc },
    #[error("branch ratios of {nuc} sum to {sum}")] BranchSum { nuc: Nuc, sum: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("invalid material quantity: {0}")] InvalidQuantity(f64),
    #[error("cannot extract {need} from material holding {have}")] Insufficient { have: f64, need: f64 },
    #[error(transparent)] Composition(#[from] CompositionError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error("buffer is empty")] Empty,
    #[error("insufficient quantity: have {have}, need {need}")] InsufficientQuantity { have: f64, need: f64 },
    #[error("capacity exceeded: space {space}, pushed {pushed}")] CapacityExceeded { space: f64, pushed: f64 },
    #[error("negative quantity: {0}")] NegativeQuantity(f64),
    #[error("insufficient material count: have {have}, need {need}")] InsufficientCount { have: usize, need: usize },
    #[error(transparent)] Material(#[from] MaterialError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackageError {
    #[error("invalid fill range: min {min}, max {max}")] InvalidFillRange { min: f64, max: f64 },
    #[error("unknown package id: {0}")] UnknownPackage(u32),
    #[error("duplicate package id: {0}")] DuplicatePackage(u32),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("no manager set on sell policy {0}")] NoManager(String),
    #[error("no buffer set on sell policy {0}")] NoBuffer(String),
    #[error("quantize {quantize} is outside the package fill min/max values ({min}, {max})")] QuantizeOutsideFill { quantize: f64, min: f64, max: f64 },
    #[error("negative {field}: {value}")] Negative { field: &'static str, value: f64 },
    #[error(transparent)] Buffer(#[from] BufferError),
    #[error(transparent)] Package(#[from] PackageError),
    #[error(transparent)] Material(#[from] MaterialError),
}

#[derive(Error, Debug)]
pub enum FuelflowError {
    #[error(transparent)] Nuclide(#[from] NuclideError),
    #[error(transparent)] Composition(#[from] CompositionError),
    #[error(transparent)] DecayLibrary(#[from] DecayLibraryError),
    #[error(transparent)] Material(#[from] MaterialError),
    #[error(transparent)] Buffer(#[from] BufferError),
    #[error(transparent)] Package(#[from] PackageError),
    #[error(transparent)] Policy(#[from] PolicyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_non_positive_quantity() {
        let e = CompositionError::NonPositiveQuantity { nuc: 922350000, qty: -1.0 };
        assert_eq!(e.to_string(), "non-positive quantity -1 for nuclide 922350000");
    }

    #[test]
    fn display_quantize_outside_fill() {
        let e = PolicyError::QuantizeOutsideFill { quantize: 3.0, min: 5.0, max: 5.0 };
        assert_eq!(
            e.to_string(),
            "quantize 3 is outside the package fill min/max values (5, 5)"
        );
    }

    #[test]
    fn policy_error_from_buffer_error() {
        let e: PolicyError = BufferError::Empty.into();
        assert_eq!(e, PolicyError::Buffer(BufferError::Empty));
    }

    #[test]
    fn buffer_error_wraps_material_error() {
        let e: BufferError = MaterialError::Insufficient { have: 1.0, need: 2.5 }.into();
        assert_eq!(e.to_string(), "cannot extract 2.5 from material holding 1");
    }

    #[test]
    fn umbrella_is_transparent() {
        let e: FuelflowError = NuclideError::UnknownName("Xx1".into()).into();
        assert_eq!(e.to_string(), "unknown nuclide name: Xx1");
    }
}
