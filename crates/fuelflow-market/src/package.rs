//! Packaging: how a requested quantity becomes deliverable containers.

use serde::{Deserialize, Serialize};

use fuelflow_core::constants::{UNPACKAGED_ID, UNPACKAGED_NAME};
use fuelflow_core::error::PackageError;

/// How a quantity is spread over packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    /// Fill each package to `fill_max` before starting the next.
    #[default]
    First,
    /// Spread the quantity evenly over the fewest packages that hold it.
    Equal,
}

/// A container type with a fill range in kg.
///
/// Deserializes through the same validation as [`Package::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PackageDef")]
pub struct Package {
    id: u32,
    name: String,
    fill_min: f64,
    fill_max: f64,
    strategy: FillStrategy,
}

#[derive(Deserialize)]
struct PackageDef {
    id: u32,
    name: String,
    #[serde(default)]
    fill_min: f64,
    #[serde(default = "unbounded")]
    fill_max: f64,
    #[serde(default)]
    strategy: FillStrategy,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

impl TryFrom<PackageDef> for Package {
    type Error = PackageError;

    fn try_from(def: PackageDef) -> Result<Self, Self::Error> {
        Package::new(def.id, def.name, def.fill_min, def.fill_max, def.strategy)
    }
}

impl Package {
    /// Fails unless `0 <= fill_min <= fill_max`.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        fill_min: f64,
        fill_max: f64,
        strategy: FillStrategy,
    ) -> Result<Self, PackageError> {
        if !(fill_min >= 0.0 && fill_min <= fill_max) {
            return Err(PackageError::InvalidFillRange {
                min: fill_min,
                max: fill_max,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            fill_min,
            fill_max,
            strategy,
        })
    }

    /// The sentinel package: any quantity fits in one.
    pub fn unpackaged() -> Self {
        Self {
            id: UNPACKAGED_ID,
            name: UNPACKAGED_NAME.to_string(),
            fill_min: 0.0,
            fill_max: f64::INFINITY,
            strategy: FillStrategy::First,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fill_min(&self) -> f64 {
        self.fill_min
    }

    pub fn fill_max(&self) -> f64 {
        self.fill_max
    }

    pub fn strategy(&self) -> FillStrategy {
        self.strategy
    }

    pub fn is_unpackaged(&self) -> bool {
        self.id == UNPACKAGED_ID
    }

    /// Mass per package when packaging `qty` kg, or 0 if `qty` cannot fill
    /// even one package. Never exceeds `qty`.
    pub fn fill_mass(&self, qty: f64) -> f64 {
        if qty < self.fill_min || qty <= 0.0 {
            return 0.0;
        }
        let fill = match self.strategy {
            FillStrategy::First => self.fill_max,
            FillStrategy::Equal => {
                let fewest = (qty / self.fill_max).ceil();
                let most = (qty / self.fill_min).floor();
                if most >= fewest {
                    qty / fewest
                } else {
                    self.fill_max
                }
            }
        };
        qty.min(fill)
    }
}
