//! Decay data: half-lives and branching to daughters.
//!
//! The built-in library covers the actinide chains and fission/activation
//! products a fuel cycle model usually tracks. Alpha particles are not
//! followed, and decay out of a chain's last tracked member leaves the
//! tracked set.

use std::collections::BTreeMap;

use fuelflow_core::constants::{SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_YEAR};
use fuelflow_core::error::DecayLibraryError;
use fuelflow_core::nuclide::{self, Nuc};
use fuelflow_core::traits::TransmuteInfo;

/// Tolerance on branch-ratio sums.
const BRANCH_TOL: f64 = 1e-9;

/// One nuclide's decay data.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayEntry {
    pub nuc: Nuc,
    /// Half-life in seconds; `f64::INFINITY` for stable nuclides.
    pub half_life: f64,
    /// `(daughter, branch ratio)` pairs. Ratios sum to at most 1.
    pub daughters: Vec<(Nuc, f64)>,
}

impl DecayEntry {
    pub fn stable(nuc: Nuc) -> Self {
        Self {
            nuc,
            half_life: f64::INFINITY,
            daughters: Vec::new(),
        }
    }

    pub fn radioactive(nuc: Nuc, half_life: f64, daughters: &[(Nuc, f64)]) -> Self {
        Self {
            nuc,
            half_life,
            daughters: daughters.to_vec(),
        }
    }

    /// Decay constant in 1/s, zero for stable nuclides.
    pub fn decay_const(&self) -> f64 {
        if self.half_life.is_finite() {
            std::f64::consts::LN_2 / self.half_life
        } else {
            0.0
        }
    }
}

/// A validated set of decay entries keyed by nuclide.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayLibrary {
    entries: BTreeMap<Nuc, DecayEntry>,
}

impl DecayLibrary {
    /// Build a library, checking ids, half-lives and that every daughter
    /// has its own entry.
    pub fn from_entries(entries: Vec<DecayEntry>) -> Result<Self, DecayLibraryError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if !nuclide::is_nuclide(entry.nuc) {
                return Err(DecayLibraryError::InvalidNuclide(entry.nuc));
            }
            if entry.half_life.is_nan() || entry.half_life <= 0.0 {
                return Err(DecayLibraryError::NonPositiveHalfLife {
                    nuc: entry.nuc,
                    half_life: entry.half_life,
                });
            }
            let sum: f64 = entry.daughters.iter().map(|(_, br)| br).sum();
            let bad_ratio = entry.daughters.iter().any(|&(_, br)| br.is_nan() || br < 0.0);
            if bad_ratio || sum > 1.0 + BRANCH_TOL {
                return Err(DecayLibraryError::BranchSum { nuc: entry.nuc, sum });
            }
            let nuc = entry.nuc;
            if map.insert(nuc, entry).is_some() {
                return Err(DecayLibraryError::Duplicate(nuc));
            }
        }
        for entry in map.values() {
            for &(daughter, _) in &entry.daughters {
                if !map.contains_key(&daughter) {
                    return Err(DecayLibraryError::UnknownDaughter {
                        parent: entry.nuc,
                        daughter,
                    });
                }
            }
        }
        Ok(Self { entries: map })
    }

    /// The library shipped with Fuelflow.
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries().into_iter().map(|e| (e.nuc, e)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, nuc: Nuc) -> Option<&DecayEntry> {
        self.entries.get(&nuc)
    }

    /// Half-life in seconds, if the nuclide is in the library.
    pub fn half_life(&self, nuc: Nuc) -> Option<f64> {
        self.get(nuc).map(|e| e.half_life)
    }

    /// Sparse decay matrix over every nuclide in the library.
    pub fn transmute_info(&self) -> TransmuteInfo {
        let nucids: Vec<Nuc> = self.entries.keys().copied().collect();
        let index = |nuc: Nuc| nucids.binary_search(&nuc).ok();

        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut decay_matrix = Vec::new();
        for (col, entry) in self.entries.values().enumerate() {
            let lambda = entry.decay_const();
            if lambda == 0.0 {
                continue;
            }
            rows.push(col);
            cols.push(col);
            decay_matrix.push(lambda);
            for &(daughter, br) in &entry.daughters {
                if let Some(row) = index(daughter) {
                    rows.push(row);
                    cols.push(col);
                    decay_matrix.push(-br * lambda);
                }
            }
        }

        TransmuteInfo {
            nucids,
            rows,
            cols,
            decay_matrix,
        }
    }
}

fn years(y: f64) -> f64 {
    y * SECS_PER_YEAR
}

fn days(d: f64) -> f64 {
    d * SECS_PER_DAY
}

fn hours(h: f64) -> f64 {
    h * SECS_PER_HOUR
}

fn builtin_entries() -> Vec<DecayEntry> {
    use DecayEntry as E;
    let n = |z, a| nuclide::id(z, a, 0);

    vec![
        // stable
        E::stable(n(1, 1)),
        E::stable(n(1, 2)),
        E::stable(n(2, 3)),
        E::stable(n(2, 4)),
        E::stable(n(6, 12)),
        E::stable(n(7, 14)),
        E::stable(n(8, 16)),
        E::stable(n(18, 40)),
        E::stable(n(20, 40)),
        E::stable(n(28, 60)),
        E::stable(n(40, 90)),
        E::stable(n(54, 131)),
        E::stable(n(56, 134)),
        E::stable(n(56, 137)),
        // light activation products
        E::radioactive(n(1, 3), years(12.32), &[(n(2, 3), 1.0)]),
        E::radioactive(n(6, 14), years(5_700.0), &[(n(7, 14), 1.0)]),
        E::radioactive(n(19, 40), years(1.248e9), &[(n(20, 40), 0.8928), (n(18, 40), 0.1072)]),
        E::radioactive(n(27, 60), years(5.2714), &[(n(28, 60), 1.0)]),
        // fission products
        E::radioactive(n(38, 90), years(28.79), &[(n(39, 90), 1.0)]),
        E::radioactive(n(39, 90), hours(64.053), &[(n(40, 90), 1.0)]),
        E::radioactive(n(53, 131), days(8.0252), &[(n(54, 131), 1.0)]),
        E::radioactive(n(55, 134), years(2.0652), &[(n(56, 134), 1.0)]),
        E::radioactive(n(55, 137), years(30.08), &[(n(56, 137), 1.0)]),
        // U-238 series head
        E::radioactive(n(92, 238), years(4.468e9), &[(n(90, 234), 1.0)]),
        E::radioactive(n(90, 234), days(24.10), &[(n(91, 234), 1.0)]),
        E::radioactive(n(91, 234), hours(6.70), &[(n(92, 234), 1.0)]),
        E::radioactive(n(92, 234), years(2.455e5), &[(n(90, 230), 1.0)]),
        E::radioactive(n(90, 230), years(7.538e4), &[]),
        // U-235 series head
        E::radioactive(n(92, 235), years(7.04e8), &[(n(90, 231), 1.0)]),
        E::radioactive(n(90, 231), hours(25.52), &[(n(91, 231), 1.0)]),
        E::radioactive(n(91, 231), years(3.276e4), &[]),
        // U-236 / Th-232
        E::radioactive(n(92, 236), years(2.342e7), &[(n(90, 232), 1.0)]),
        E::radioactive(n(90, 232), years(1.405e10), &[]),
        // plutonium and the neptunium series
        E::radioactive(n(94, 238), years(87.7), &[(n(92, 234), 1.0)]),
        E::radioactive(n(94, 239), years(2.411e4), &[(n(92, 235), 1.0)]),
        E::radioactive(n(94, 240), years(6_561.0), &[(n(92, 236), 1.0)]),
        E::radioactive(n(94, 241), years(14.29), &[(n(95, 241), 1.0)]),
        E::radioactive(n(95, 241), years(432.6), &[(n(93, 237), 1.0)]),
        E::radioactive(n(93, 237), years(2.144e6), &[(n(91, 233), 1.0)]),
        E::radioactive(n(91, 233), days(26.975), &[(n(92, 233), 1.0)]),
        E::radioactive(n(92, 233), years(1.592e5), &[(n(90, 229), 1.0)]),
        E::radioactive(n(90, 229), years(7_932.0), &[]),
    ]
}
