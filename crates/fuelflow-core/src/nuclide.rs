//! Nuclide identifiers, names and atomic masses.
//!
//! A nuclide id is an `i32` in the canonical `ZZZAAASSSS` form:
//! `Z * 10^7 + A * 10^4 + S`, where `S` is the metastable state.
//! U-235 is `922350000`, Am-242m is `952420001`.

use crate::error::NuclideError;

/// Nuclide identifier in `ZZZAAASSSS` form.
pub type Nuc = i32;

const Z_FACTOR: i32 = 10_000_000;
const A_FACTOR: i32 = 10_000;
const MAX_Z: i32 = 118;
const MAX_A: i32 = 300;
const MAX_STATE: i32 = 10;

/// Element symbols indexed by `Z - 1`.
const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Measured atomic masses in g/mol for the nuclides the built-in decay
/// library tracks. Sorted by id.
const ATOMIC_MASSES: &[(Nuc, f64)] = &[
    (10010000, 1.007_825_032_07),
    (10020000, 2.014_101_777_8),
    (10030000, 3.016_049_277_7),
    (20030000, 3.016_029_319_1),
    (20040000, 4.002_603_254_15),
    (60120000, 12.0),
    (60140000, 14.003_241_988_4),
    (70140000, 14.003_074_004_8),
    (80160000, 15.994_914_619_56),
    (180400000, 39.962_383_122_5),
    (190400000, 39.963_998_48),
    (200400000, 39.962_590_98),
    (270600000, 59.933_817_1),
    (280600000, 59.930_786_4),
    (380900000, 89.907_738),
    (390900000, 89.907_151_9),
    (400900000, 89.904_704_4),
    (531310000, 130.906_124_6),
    (541310000, 130.905_082_4),
    (551340000, 133.906_718),
    (551370000, 136.907_089_5),
    (561340000, 133.904_508_4),
    (561370000, 136.905_827_4),
    (902290000, 229.031_762),
    (902300000, 230.033_133_8),
    (902310000, 231.036_304_3),
    (902320000, 232.038_055_3),
    (902340000, 234.043_601_2),
    (912310000, 231.035_884),
    (912330000, 233.040_247_3),
    (912340000, 234.043_308_1),
    (922330000, 233.039_635_2),
    (922340000, 234.040_952_1),
    (922350000, 235.043_929_9),
    (922360000, 236.045_568),
    (922380000, 238.050_788_2),
    (932370000, 237.048_173_4),
    (942380000, 238.049_559_9),
    (942390000, 239.052_163_4),
    (942400000, 240.053_813_5),
    (942410000, 241.056_851_5),
    (952410000, 241.056_829_1),
];

/// Build an id from its parts without validation.
pub const fn id(z: i32, a: i32, state: i32) -> Nuc {
    z * Z_FACTOR + a * A_FACTOR + state
}

/// Atomic number.
pub fn znum(nuc: Nuc) -> i32 {
    nuc / Z_FACTOR
}

/// Mass number.
pub fn anum(nuc: Nuc) -> i32 {
    (nuc / A_FACTOR) % 1000
}

/// Metastable excitation level, 0 for the ground state.
pub fn state(nuc: Nuc) -> i32 {
    nuc % A_FACTOR
}

/// Whether `nuc` denotes a physically meaningful nuclide.
pub fn is_nuclide(nuc: Nuc) -> bool {
    if nuc <= 0 {
        return false;
    }
    let (z, a, s) = (znum(nuc), anum(nuc), state(nuc));
    (1..=MAX_Z).contains(&z) && a >= z && a < MAX_A && s < MAX_STATE
}

/// Element symbol for an atomic number.
pub fn symbol(z: i32) -> Option<&'static str> {
    if (1..=MAX_Z).contains(&z) {
        Some(SYMBOLS[(z - 1) as usize])
    } else {
        None
    }
}

/// Canonical display name, e.g. `U235` or `Am242m`.
pub fn name(nuc: Nuc) -> String {
    let sym = symbol(znum(nuc)).unwrap_or("?");
    match state(nuc) {
        0 => format!("{sym}{}", anum(nuc)),
        1 => format!("{sym}{}m", anum(nuc)),
        s => format!("{sym}{}m{s}", anum(nuc)),
    }
}

/// Parse a nuclide from a name (`U235`, `U-235`, `am242m`) or a
/// canonical numeric id (`922350000`).
pub fn parse(text: &str) -> Result<Nuc, NuclideError> {
    let unknown = || NuclideError::UnknownName(text.to_string());
    let trimmed = text.trim();

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let nuc: Nuc = trimmed.parse().map_err(|_| unknown())?;
        return if is_nuclide(nuc) {
            Ok(nuc)
        } else {
            Err(NuclideError::InvalidId(nuc))
        };
    }

    let letters: String = trimmed.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let rest = trimmed[letters.len()..].trim_start_matches('-');
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let suffix = rest[digits.len()..].to_ascii_lowercase();
    if letters.is_empty() || digits.is_empty() {
        return Err(unknown());
    }

    let z = SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(&letters))
        .map(|i| i as i32 + 1)
        .ok_or_else(unknown)?;
    let a: i32 = digits.parse().map_err(|_| unknown())?;
    let s = match suffix.as_str() {
        "" => 0,
        "m" => 1,
        other => match other.strip_prefix('m').map(str::parse::<i32>) {
            Some(Ok(level)) => level,
            _ => return Err(unknown()),
        },
    };

    let nuc = id(z, a, s);
    if is_nuclide(nuc) {
        Ok(nuc)
    } else {
        Err(NuclideError::InvalidId(nuc))
    }
}

/// Atomic mass in g/mol. Falls back to the mass number for nuclides
/// without a tabulated value.
pub fn atomic_mass(nuc: Nuc) -> f64 {
    let ground = nuc - state(nuc);
    match ATOMIC_MASSES.binary_search_by_key(&ground, |&(n, _)| n) {
        Ok(i) => ATOMIC_MASSES[i].1,
        Err(_) => anum(nuc) as f64,
    }
}

/// Whether `atomic_mass` has a measured value for `nuc` rather than the
/// mass-number fallback.
pub fn has_tabulated_mass(nuc: Nuc) -> bool {
    let ground = nuc - state(nuc);
    ATOMIC_MASSES.binary_search_by_key(&ground, |&(n, _)| n).is_ok()
}
