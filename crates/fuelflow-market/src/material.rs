//! Material: a quantity of mass with a composition.
//!
//! Materials are the unit of inventory held in buffers and traded between
//! agents. The composition is a shared immutable handle; splitting,
//! transmuting or mixing a material replaces its handle, never mutates the
//! composition behind it.

use std::fmt;

use fuelflow_core::comp_math::{self, CompMap};
use fuelflow_core::error::MaterialError;
use fuelflow_decay::Composition;

/// A quantity of material in kg with its composition.
#[derive(Debug, Clone)]
pub struct Material {
    qty: f64,
    comp: Composition,
    /// Timestep the composition was last projected to.
    prev_decay_time: u64,
}

impl Material {
    /// New material created at time 0.
    pub fn new(qty: f64, comp: Composition) -> Result<Self, MaterialError> {
        check_qty(qty)?;
        Ok(Self {
            qty,
            comp,
            prev_decay_time: 0,
        })
    }

    /// Set the creation timestep; later [`decay`](Self::decay) calls project
    /// from here.
    pub fn created_at(mut self, time: u64) -> Self {
        self.prev_decay_time = time;
        self
    }

    pub fn quantity(&self) -> f64 {
        self.qty
    }

    pub fn comp(&self) -> &Composition {
        &self.comp
    }

    pub fn prev_decay_time(&self) -> u64 {
        self.prev_decay_time
    }

    /// Replace the composition, keeping the quantity.
    pub fn transmute(&mut self, comp: Composition) {
        self.comp = comp;
    }

    /// Split `qty` kg off into a new material with the same composition.
    pub fn extract_qty(&mut self, qty: f64) -> Result<Material, MaterialError> {
        check_qty(qty)?;
        if qty > self.qty {
            return Err(MaterialError::Insufficient {
                have: self.qty,
                need: qty,
            });
        }
        self.qty -= qty;
        Ok(Material {
            qty,
            comp: self.comp.clone(),
            prev_decay_time: self.prev_decay_time,
        })
    }

    /// Merge `other` into this material.
    ///
    /// Equal compositions just add quantities. Otherwise the mass fractions
    /// are mixed by quantity into a new root composition.
    pub fn absorb(&mut self, other: Material) -> Result<(), MaterialError> {
        if other.qty <= 0.0 {
            return Ok(());
        }
        if self.qty <= 0.0 {
            *self = Material {
                qty: self.qty + other.qty,
                ..other
            };
            return Ok(());
        }
        if self.comp != other.comp {
            let mixed = comp_math::add(
                &mass_scaled(&self.comp, self.qty),
                &mass_scaled(&other.comp, other.qty),
            );
            self.comp = Composition::create_from_mass(mixed)?;
        }
        self.qty += other.qty;
        self.prev_decay_time = self.prev_decay_time.max(other.prev_decay_time);
        Ok(())
    }

    /// Project the composition forward to `curr_time`.
    ///
    /// The elapsed timesteps since the last projection go through the
    /// composition's decay lineage, so materials sharing a lineage share the
    /// projected composition.
    pub fn decay(&mut self, curr_time: u64, secs_per_timestep: u64) -> &Composition {
        let dt = curr_time.saturating_sub(self.prev_decay_time);
        if dt > 0 {
            self.comp = self.comp.decay_with_timestep(dt, secs_per_timestep);
            self.prev_decay_time = curr_time;
        }
        &self.comp
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg (composition {})", self.qty, self.comp.id())
    }
}

fn check_qty(qty: f64) -> Result<(), MaterialError> {
    if qty.is_finite() && qty >= 0.0 {
        Ok(())
    } else {
        Err(MaterialError::InvalidQuantity(qty))
    }
}

/// Mass vector of `comp` scaled to total `qty`.
fn mass_scaled(comp: &Composition, qty: f64) -> CompMap {
    let mut m = comp.mass().clone();
    comp_math::normalize(&mut m, qty);
    m
}
