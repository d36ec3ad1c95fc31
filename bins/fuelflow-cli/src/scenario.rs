//! Scenario files for the `sell` command.
//!
//! A scenario is TOML read through the `config` crate. Any key can be
//! overridden from the environment with the `FUELFLOW__` prefix and `__`
//! between nested keys, e.g. `FUELFLOW__PERIODS=24` or
//! `FUELFLOW__SELLER__THROUGHPUT=50`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use fuelflow_core::comp_math::CompMap;
use fuelflow_core::constants::DEFAULT_TIMESTEP_SECS;
use fuelflow_core::nuclide;
use fuelflow_market::{Package, SellPolicyConfig};

/// Whole-run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_timestep")]
    pub timestep_secs: u64,
    #[serde(default = "default_periods")]
    pub periods: u64,
    #[serde(default)]
    pub packages: Vec<Package>,
    pub seller: SellPolicyConfig,
    pub inventory: InventoryConfig,
    /// Requests placed every period.
    #[serde(default)]
    pub requests: Vec<RequestConfig>,
}

/// The seller's starting stock.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    pub quantity: f64,
    /// Nuclide name to mass.
    pub composition: BTreeMap<String, f64>,
}

/// One standing request.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    pub commodity: String,
    pub quantity: f64,
    #[serde(default = "default_requester")]
    pub requester: String,
    /// Requested composition; the inventory's if absent.
    #[serde(default)]
    pub composition: Option<BTreeMap<String, f64>>,
}

fn default_timestep() -> u64 {
    DEFAULT_TIMESTEP_SECS
}

fn default_periods() -> u64 {
    12
}

fn default_requester() -> String {
    "consumer".to_string()
}

impl ScenarioConfig {
    /// Read `path` and apply `FUELFLOW__*` overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("FUELFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid scenario {}", path.display()))
    }
}

/// Parse a `name -> quantity` table into a nuclide vector.
pub fn comp_map(named: &BTreeMap<String, f64>) -> Result<CompMap> {
    named
        .iter()
        .map(|(name, &qty)| {
            let nuc = nuclide::parse(name).with_context(|| format!("bad nuclide {name:?}"))?;
            Ok((nuc, qty))
        })
        .collect()
}
