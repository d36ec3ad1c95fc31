//! Sell-side trading policy over a material buffer.
//!
//! A [`SellPolicy`] offers the contents of its agent's buffer on a set of
//! commodities. Each round it answers requests with bids bounded by
//! [`SellPolicy::limit`], and later settles awarded trades by popping
//! material from the buffer.
//!
//! Lifecycle: configure, [`start`](SellPolicy::start) to register with the
//! exchange, [`stop`](SellPolicy::stop) (or drop) to deregister.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fuelflow_core::constants::{EPS, EPS_RSRC, UNPACKAGED_ID};
use fuelflow_core::error::{BufferError, PolicyError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buffer::ResBuf;
use crate::context::Agent;
use crate::exchange::{BidPortfolio, CapacityConstraint, CommodMap, Trade, TradeResponse};
use crate::material::Material;
use crate::package::Package;
use crate::traits::Trader;

static NEXT_TRADER_ID: AtomicU64 = AtomicU64::new(1);

/// Serializable policy settings, as read from a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellPolicyConfig {
    pub name: String,
    pub commodities: Vec<String>,
    /// Lot size; 0 sells continuously.
    pub quantize: f64,
    /// Per-round cap in kg.
    pub throughput: f64,
    /// Deliver the requested composition instead of the buffer's own.
    pub ignore_comp: bool,
    pub package: u32,
}

impl Default for SellPolicyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            commodities: Vec::new(),
            quantize: 0.0,
            throughput: f64::INFINITY,
            ignore_comp: false,
            package: UNPACKAGED_ID,
        }
    }
}

/// Offers buffered material to the exchange.
pub struct SellPolicy {
    trader_id: u64,
    manager: Option<Agent>,
    buf: Option<Arc<Mutex<ResBuf>>>,
    name: String,
    quantize: f64,
    throughput: f64,
    ignore_comp: bool,
    package: Arc<Package>,
    commods: BTreeSet<String>,
}

impl Default for SellPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SellPolicy {
    /// Unbound policy: continuous, unbounded throughput, strict composition,
    /// unpackaged.
    pub fn new() -> Self {
        Self {
            trader_id: NEXT_TRADER_ID.fetch_add(1, Ordering::SeqCst),
            manager: None,
            buf: None,
            name: String::new(),
            quantize: 0.0,
            throughput: f64::INFINITY,
            ignore_comp: false,
            package: Arc::new(Package::unpackaged()),
            commods: BTreeSet::new(),
        }
    }

    /// Bind the managing agent, the buffer to sell from and a display name.
    /// Resets packaging to unpackaged.
    pub fn init(
        &mut self,
        manager: Agent,
        buf: Arc<Mutex<ResBuf>>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.manager = Some(manager);
        self.buf = Some(buf);
        self.name = name.into();
        self.package = Arc::new(Package::unpackaged());
        self
    }

    /// Build a bound policy from scenario settings.
    pub fn from_config(
        config: &SellPolicyConfig,
        manager: Agent,
        buf: Arc<Mutex<ResBuf>>,
    ) -> Result<Self, PolicyError> {
        let mut policy = Self::new();
        policy
            .init(manager, buf, config.name.clone())
            .set_ignore_comp(config.ignore_comp)
            .set_quantize(config.quantize)?
            .set_throughput(config.throughput)?
            .set_package(config.package)?;
        for commod in &config.commodities {
            policy.set(commod.clone());
        }
        Ok(policy)
    }

    pub fn set_quantize(&mut self, quantize: f64) -> Result<&mut Self, PolicyError> {
        self.quantize = non_negative("quantize", quantize)?;
        Ok(self)
    }

    pub fn set_throughput(&mut self, throughput: f64) -> Result<&mut Self, PolicyError> {
        self.throughput = non_negative("throughput", throughput)?;
        Ok(self)
    }

    pub fn set_ignore_comp(&mut self, ignore_comp: bool) -> &mut Self {
        self.ignore_comp = ignore_comp;
        self
    }

    /// Use the package registered under `id` in the manager's context.
    /// Without a manager only the unpackaged sentinel is available.
    pub fn set_package(&mut self, id: u32) -> Result<&mut Self, PolicyError> {
        self.package = match &self.manager {
            Some(manager) => manager.context().package(id)?,
            None => {
                if id != UNPACKAGED_ID {
                    warn!(policy = %self.name, package = id, "no manager bound, using unpackaged");
                }
                Arc::new(Package::unpackaged())
            }
        };
        Ok(self)
    }

    /// Add a commodity to sell on.
    pub fn set(&mut self, commod: impl Into<String>) -> &mut Self {
        self.commods.insert(commod.into());
        self
    }

    /// Register with the exchange.
    ///
    /// Requires a manager and a buffer; a nonzero lot size must lie within
    /// the package's fill range. Nothing is registered on failure.
    pub fn start(&self) -> Result<(), PolicyError> {
        let manager = self.manager()?;
        if self.buf.is_none() {
            return Err(PolicyError::NoBuffer(self.name.clone()));
        }
        let (min, max) = (self.package.fill_min(), self.package.fill_max());
        if self.excl() && (self.quantize < min || self.quantize > max) {
            return Err(PolicyError::QuantizeOutsideFill {
                quantize: self.quantize,
                min,
                max,
            });
        }
        manager.context().register_trader(self.trader_id, &self.name);
        info!(policy = %self.name, agent = %manager, "sell policy started");
        Ok(())
    }

    /// Deregister from the exchange.
    pub fn stop(&self) -> Result<(), PolicyError> {
        let manager = self.manager()?;
        manager.context().unregister_trader(self.trader_id);
        info!(policy = %self.name, agent = %manager, "sell policy stopped");
        Ok(())
    }

    /// Whether the policy is currently registered.
    pub fn is_active(&self) -> bool {
        self.manager
            .as_ref()
            .is_some_and(|m| m.context().is_registered(self.trader_id))
    }

    /// Most this policy will offer this round.
    ///
    /// With a lot size the buffer quantity is floored to whole lots. Capped
    /// by throughput.
    pub fn limit(&self) -> f64 {
        match &self.buf {
            Some(buf) => self.limit_for(buf.lock().quantity()),
            None => 0.0,
        }
    }

    fn limit_for(&self, available: f64) -> f64 {
        let usable = if self.excl() {
            self.quantize * whole_lots(available, self.quantize)
        } else {
            available
        };
        self.throughput.min(usable)
    }

    /// Quantized lots are atomic.
    fn excl(&self) -> bool {
        self.quantize > 0.0
    }

    fn manager(&self) -> Result<&Agent, PolicyError> {
        self.manager
            .as_ref()
            .ok_or_else(|| PolicyError::NoManager(self.name.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantize(&self) -> f64 {
        self.quantize
    }

    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    pub fn ignore_comp(&self) -> bool {
        self.ignore_comp
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn commodities(&self) -> impl Iterator<Item = &str> {
        self.commods.iter().map(String::as_str)
    }

    pub fn buffer(&self) -> Option<&Arc<Mutex<ResBuf>>> {
        self.buf.as_ref()
    }
}

impl Trader for SellPolicy {
    fn trader_id(&self) -> u64 {
        self.trader_id
    }

    fn trader_name(&self) -> &str {
        &self.name
    }

    /// One portfolio capped at [`SellPolicy::limit`], or none when there is
    /// nothing to offer.
    ///
    /// Every request on a sold commodity gets `floor(qty / lot)` bids, where
    /// `qty` is the request size capped by the limit and `lot` is the lot
    /// size (quantized) or the package fill for `qty` (continuous). Offers
    /// take the buffer's materials' compositions in turn, or the requested
    /// composition with `ignore_comp`.
    fn get_matl_bids(&self, requests: &CommodMap) -> Result<Vec<BidPortfolio>, PolicyError> {
        let Some(buf) = &self.buf else {
            return Ok(Vec::new());
        };
        let buf = buf.lock();
        let limit = self.limit_for(buf.quantity());
        if buf.is_empty() || buf.quantity() < EPS || limit < EPS {
            return Ok(Vec::new());
        }
        // Strict offers cycle through the buffer, one material per bid,
        // across all requests.
        let mut stock = buf.iter().map(Material::comp).cycle();

        let mut port = BidPortfolio::new(self.name.clone());
        port.add_constraint(CapacityConstraint::new(limit));
        info!(policy = %self.name, limit, "bidding out");

        let excl = self.excl();
        for commod in &self.commods {
            let Some(reqs) = requests.get(commod) else {
                continue;
            };
            for req in reqs {
                let qty = req.target.quantity().min(limit);
                let package_fill = qty.min(self.package.fill_mass(qty));
                let (nbids, bid_qty) = if excl {
                    (whole_lots(qty, self.quantize) as usize, self.quantize)
                } else if package_fill > EPS {
                    ((qty / package_fill).floor() as usize, package_fill)
                } else {
                    continue;
                };
                for _ in 0..nbids {
                    let comp = if self.ignore_comp {
                        req.target.comp()
                    } else {
                        stock.next().ok_or(BufferError::Empty)?
                    };
                    port.add_bid(Arc::clone(req), Material::new(bid_qty, comp.clone())?, excl);
                    debug!(policy = %self.name, qty = bid_qty, commodity = %commod, "bid");
                }
            }
        }

        if port.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![port])
    }

    /// Pops each trade's amount from the buffer, within [`EPS_RSRC`].
    ///
    /// With `ignore_comp` the delivered material takes the requested
    /// composition; what stays in the buffer is untouched.
    fn get_matl_trades(
        &self,
        trades: &[Trade],
        responses: &mut Vec<TradeResponse>,
    ) -> Result<(), PolicyError> {
        let buf = self
            .buf
            .as_ref()
            .ok_or_else(|| PolicyError::NoBuffer(self.name.clone()))?;
        let mut buf = buf.lock();
        for trade in trades {
            info!(
                policy = %self.name,
                qty = trade.amt,
                commodity = %trade.request.commodity,
                "sending"
            );
            let mut mat = buf.pop_qty(trade.amt, EPS_RSRC)?;
            if self.ignore_comp {
                mat.transmute(trade.request.target.comp().clone());
            }
            responses.push((trade.clone(), mat));
        }
        Ok(())
    }
}

impl Drop for SellPolicy {
    fn drop(&mut self) {
        if let Some(manager) = &self.manager {
            manager.context().unregister_trader(self.trader_id);
        }
    }
}

/// Number of whole `lot`s in `qty`, counting a lot short by no more than
/// the settlement tolerance.
fn whole_lots(qty: f64, lot: f64) -> f64 {
    ((qty + EPS_RSRC) / lot).floor()
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, PolicyError> {
    if value.is_nan() || value < 0.0 {
        return Err(PolicyError::Negative { field, value });
    }
    Ok(value)
}
