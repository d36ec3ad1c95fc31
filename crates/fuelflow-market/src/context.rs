//! Simulation context shared by the agents of one run.
//!
//! The [`Context`] owns the clock, the package registry, the set of traders
//! registered with the exchange, and the output recorder. Agents hold it by
//! `Arc`; all mutation goes through interior locks so a context can be
//! shared across policies.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fuelflow_core::constants::DEFAULT_TIMESTEP_SECS;
use fuelflow_core::error::PackageError;
use fuelflow_core::traits::Recorder;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::package::Package;

/// Clock, registries and output sink for one simulation.
pub struct Context {
    time: AtomicU64,
    dt: u64,
    packages: RwLock<BTreeMap<u32, Arc<Package>>>,
    traders: RwLock<BTreeMap<u64, String>>,
    recorder: Arc<dyn Recorder>,
    next_agent_id: AtomicU64,
}

impl Context {
    /// New context at time 0 with `dt` seconds per timestep. The unpackaged
    /// sentinel is pre-registered.
    pub fn new(dt: u64, recorder: Arc<dyn Recorder>) -> Self {
        let unpackaged = Package::unpackaged();
        let mut packages = BTreeMap::new();
        packages.insert(unpackaged.id(), Arc::new(unpackaged));
        Self {
            time: AtomicU64::new(0),
            dt,
            packages: RwLock::new(packages),
            traders: RwLock::new(BTreeMap::new()),
            recorder,
            next_agent_id: AtomicU64::new(1),
        }
    }

    /// Context with the default timestep.
    pub fn with_recorder(recorder: Arc<dyn Recorder>) -> Self {
        Self::new(DEFAULT_TIMESTEP_SECS, recorder)
    }

    /// Current timestep.
    pub fn time(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    /// Seconds per timestep.
    pub fn dt(&self) -> u64 {
        self.dt
    }

    /// Step the clock forward; returns the new time.
    pub fn advance(&self) -> u64 {
        let t = self.time.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(time = t, "advanced clock");
        t
    }

    pub fn recorder(&self) -> &dyn Recorder {
        self.recorder.as_ref()
    }

    pub(crate) fn next_agent_id(&self) -> u64 {
        self.next_agent_id.fetch_add(1, Ordering::SeqCst)
    }

    // --- packages ---

    /// Register a package under its id.
    pub fn add_package(&self, package: Package) -> Result<Arc<Package>, PackageError> {
        let mut packages = self.packages.write();
        if packages.contains_key(&package.id()) {
            return Err(PackageError::DuplicatePackage(package.id()));
        }
        let package = Arc::new(package);
        packages.insert(package.id(), Arc::clone(&package));
        debug!(id = package.id(), name = package.name(), "registered package");
        Ok(package)
    }

    pub fn package(&self, id: u32) -> Result<Arc<Package>, PackageError> {
        self.packages
            .read()
            .get(&id)
            .cloned()
            .ok_or(PackageError::UnknownPackage(id))
    }

    // --- traders ---

    /// Mark a trader as taking part in the exchange. Re-registering is a
    /// no-op.
    pub fn register_trader(&self, id: u64, name: &str) {
        if self.traders.write().insert(id, name.to_string()).is_none() {
            info!(trader = name, id, "registered trader");
        }
    }

    /// Remove a trader; returns whether it was registered.
    pub fn unregister_trader(&self, id: u64) -> bool {
        match self.traders.write().remove(&id) {
            Some(name) => {
                info!(trader = %name, id, "unregistered trader");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, id: u64) -> bool {
        self.traders.read().contains_key(&id)
    }

    /// Registered trader ids in ascending order.
    pub fn trader_ids(&self) -> Vec<u64> {
        self.traders.read().keys().copied().collect()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("time", &self.time())
            .field("dt", &self.dt)
            .field("packages", &self.packages.read().len())
            .field("traders", &self.traders.read().len())
            .finish_non_exhaustive()
    }
}

/// An agent's binding to its context; the manager of a trading policy.
#[derive(Clone)]
pub struct Agent {
    id: u64,
    prototype: String,
    context: Arc<Context>,
}

impl Agent {
    pub fn new(prototype: impl Into<String>, context: Arc<Context>) -> Self {
        Self {
            id: context.next_agent_id(),
            prototype: prototype.into(),
            context,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn prototype(&self) -> &str {
        &self.prototype
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }
}

/// `prototype-id`
impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prototype, self.id)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("prototype", &self.prototype)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::FillStrategy;
    use fuelflow_core::constants::UNPACKAGED_ID;
    use fuelflow_core::recorder::MemoryRecorder;

    fn ctx() -> Arc<Context> {
        Arc::new(Context::with_recorder(Arc::new(MemoryRecorder::new())))
    }

    #[test]
    fn clock_advances() {
        let c = ctx();
        assert_eq!(c.time(), 0);
        assert_eq!(c.advance(), 1);
        assert_eq!(c.advance(), 2);
        assert_eq!(c.time(), 2);
        assert_eq!(c.dt(), DEFAULT_TIMESTEP_SECS);
    }

    #[test]
    fn unpackaged_is_preregistered() {
        let c = ctx();
        assert!(c.package(UNPACKAGED_ID).unwrap().is_unpackaged());
        assert_eq!(
            c.add_package(Package::unpackaged()).unwrap_err(),
            PackageError::DuplicatePackage(UNPACKAGED_ID)
        );
    }

    #[test]
    fn package_registry() {
        let c = ctx();
        let p = Package::new(2, "drum", 1.0, 5.0, FillStrategy::First).unwrap();
        c.add_package(p.clone()).unwrap();
        assert_eq!(*c.package(2).unwrap(), p);
        assert_eq!(c.package(9).unwrap_err(), PackageError::UnknownPackage(9));
    }

    #[test]
    fn trader_registration() {
        let c = ctx();
        c.register_trader(5, "seller");
        c.register_trader(5, "seller");
        assert!(c.is_registered(5));
        assert_eq!(c.trader_ids(), vec![5]);
        assert!(c.unregister_trader(5));
        assert!(!c.unregister_trader(5));
        assert!(!c.is_registered(5));
    }

    #[test]
    fn agents_get_distinct_ids() {
        let c = ctx();
        let a = Agent::new("Source", Arc::clone(&c));
        let b = Agent::new("Source", Arc::clone(&c));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.to_string(), format!("Source-{}", a.id()));
        assert!(Arc::ptr_eq(a.context(), &c));
    }
}
