//! Immutable nuclide compositions and their shared decay lineage.
//!
//! A [`Composition`] is a snapshot of nuclide quantities at one point of a
//! decay lineage. Every composition derived from a root by decay shares the
//! root's [`DecayChain`], a cache keyed by cumulative decay offset, so that
//! projecting any member of the lineage to the same offset returns the same
//! composition.
//!
//! The chain stores composition state, not handles, so a lineage has no
//! reference cycle: the chain lives exactly as long as some [`Composition`]
//! of the lineage does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use fuelflow_core::comp_math::{self, CompMap};
use fuelflow_core::constants::{COMPOSITIONS_TABLE, DEFAULT_TIMESTEP_SECS};
use fuelflow_core::error::CompositionError;
use fuelflow_core::nuclide;
use fuelflow_core::traits::{Recorder, TransmutationSolver};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::solver::default_solver;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Take the next composition id. Ids start at 1 and strictly increase
/// across every lineage in the process.
fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

/// The id the next composition will receive.
pub fn peek_next_id() -> u64 {
    NEXT_ID.load(Ordering::SeqCst)
}

/// Per-composition state owned by the lineage cache.
#[derive(Debug)]
struct State {
    id: u64,
    offset: u64,
    mass: OnceLock<CompMap>,
    atom: OnceLock<CompMap>,
    recorded: AtomicBool,
}

impl State {
    fn new(offset: u64) -> Self {
        Self {
            id: next_id(),
            offset,
            mass: OnceLock::new(),
            atom: OnceLock::new(),
            recorded: AtomicBool::new(false),
        }
    }

    fn with_mass(offset: u64, mass: CompMap) -> Self {
        let s = Self::new(offset);
        let _ = s.mass.set(mass);
        s
    }

    fn with_atom(offset: u64, atom: CompMap) -> Self {
        let s = Self::new(offset);
        let _ = s.atom.set(atom);
        s
    }
}

/// Decay cache shared by every composition of one lineage.
///
/// Entries are inserted once and never removed or replaced. The chain also
/// fixes the solver used for every projection in the lineage.
pub struct DecayChain {
    entries: RwLock<BTreeMap<u64, Arc<State>>>,
    solver: Arc<dyn TransmutationSolver>,
}

impl DecayChain {
    fn new(solver: Arc<dyn TransmutationSolver>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            solver,
        }
    }

    fn get(&self, offset: u64) -> Option<Arc<State>> {
        self.entries.read().get(&offset).cloned()
    }

    /// Return the entry at `offset`, building and inserting it with `build`
    /// if absent. `build` runs under the write lock, so concurrent callers
    /// for the same offset observe a single entry.
    fn get_or_insert_with(&self, offset: u64, build: impl FnOnce() -> State) -> Arc<State> {
        self.entries
            .write()
            .entry(offset)
            .or_insert_with(|| Arc::new(build()))
            .clone()
    }

    /// Number of cached offsets, the root included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `offset` has been computed.
    pub fn contains(&self, offset: u64) -> bool {
        self.entries.read().contains_key(&offset)
    }

    /// Cached offsets in ascending order.
    pub fn offsets(&self) -> Vec<u64> {
        self.entries.read().keys().copied().collect()
    }

    /// Solver every projection of this lineage uses.
    pub fn solver(&self) -> &Arc<dyn TransmutationSolver> {
        &self.solver
    }
}

impl fmt::Debug for DecayChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecayChain")
            .field("offsets", &self.offsets())
            .finish_non_exhaustive()
    }
}

/// Which basis a root composition is supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Mass,
    Atom,
}

/// Handle to an immutable composition.
///
/// Cloning is cheap and yields the same composition (same id).
#[derive(Clone)]
pub struct Composition {
    state: Arc<State>,
    chain: Arc<DecayChain>,
}

impl Composition {
    /// Root composition from atom-basis quantities, decayed with the
    /// process default solver.
    pub fn create_from_atom(v: CompMap) -> Result<Self, CompositionError> {
        Self::create_root(Basis::Atom, v, default_solver())
    }

    /// Root composition from mass-basis quantities, decayed with the
    /// process default solver.
    pub fn create_from_mass(v: CompMap) -> Result<Self, CompositionError> {
        Self::create_root(Basis::Mass, v, default_solver())
    }

    /// Root composition whose lineage decays with `solver`.
    pub fn create_with_solver(
        basis: Basis,
        v: CompMap,
        solver: Arc<dyn TransmutationSolver>,
    ) -> Result<Self, CompositionError> {
        Self::create_root(basis, v, solver)
    }

    fn create_root(
        basis: Basis,
        v: CompMap,
        solver: Arc<dyn TransmutationSolver>,
    ) -> Result<Self, CompositionError> {
        validate(&v)?;
        let chain = Arc::new(DecayChain::new(solver));
        let state = chain.get_or_insert_with(0, || match basis {
            Basis::Mass => State::with_mass(0, v),
            Basis::Atom => State::with_atom(0, v),
        });
        trace!(id = state.id, ?basis, "new root composition");
        Ok(Self { state, chain })
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Cumulative decay offset, in timesteps, from the lineage root.
    pub fn offset(&self) -> u64 {
        self.state.offset
    }

    /// The lineage cache this composition belongs to.
    pub fn chain(&self) -> &DecayChain {
        &self.chain
    }

    /// Whether both handles refer to the same composition instance.
    pub fn same_instance(&self, other: &Composition) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Whether both handles share a lineage.
    pub fn same_lineage(&self, other: &Composition) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain)
    }

    /// Whether `record` has already run for this composition.
    pub fn recorded(&self) -> bool {
        self.state.recorded.load(Ordering::SeqCst)
    }

    /// Atom-basis quantities, derived from the mass basis on first use.
    pub fn atom(&self) -> &CompMap {
        self.state.atom.get_or_init(|| match self.state.mass.get() {
            Some(mass) => comp_math::mass_to_atom(mass),
            None => CompMap::new(),
        })
    }

    /// Mass-basis quantities, derived from the atom basis on first use.
    pub fn mass(&self) -> &CompMap {
        self.state.mass.get_or_init(|| match self.state.atom.get() {
            Some(atom) => comp_math::atom_to_mass(atom),
            None => CompMap::new(),
        })
    }

    /// Project forward by `delta` timesteps of the default duration.
    pub fn decay(&self, delta: u64) -> Composition {
        self.decay_with_timestep(delta, DEFAULT_TIMESTEP_SECS)
    }

    /// Project forward by `delta` timesteps of `secs_per_timestep` seconds.
    ///
    /// The result is cached in the lineage at `offset() + delta`; any later
    /// projection of any lineage member to that offset returns it. Offsets
    /// saturate at `u64::MAX`.
    pub fn decay_with_timestep(&self, delta: u64, secs_per_timestep: u64) -> Composition {
        let target = self.state.offset.saturating_add(delta);
        if target - self.state.offset != delta {
            warn!(id = self.id(), offset = self.state.offset, delta, "decay offset saturated");
        }
        let delta = target - self.state.offset;
        if let Some(state) = self.chain.get(target) {
            trace!(id = state.id, target, "decay cache hit");
            return self.member(state);
        }

        let state = self
            .chain
            .get_or_insert_with(target, || self.new_decay(delta, secs_per_timestep, target));
        debug!(from = self.id(), to = state.id, target, "decay cache miss");
        self.member(state)
    }

    fn member(&self, state: Arc<State>) -> Composition {
        Composition {
            state,
            chain: Arc::clone(&self.chain),
        }
    }

    fn new_decay(&self, delta: u64, secs_per_timestep: u64, target: u64) -> State {
        let atom = self.atom();

        // Known permissive case: an empty composition has nothing to decay,
        // so the projection is an empty composition rather than a solver call.
        if atom.is_empty() {
            return State::with_atom(target, CompMap::new());
        }

        let solver = &self.chain.solver;
        let info = solver.info();
        let mut n0 = vec![0.0; info.n()];
        // Nuclides the solver does not track are carried through as stable.
        // This keeps them in the result, where a solver-output-only
        // projection would drop them.
        let mut untracked = CompMap::new();
        for (&nuc, &qty) in atom {
            match solver.index_of(nuc) {
                Some(i) => n0[i] = qty,
                None => {
                    untracked.insert(nuc, qty);
                }
            }
        }
        if !untracked.is_empty() {
            trace!(count = untracked.len(), "untracked nuclides carried through decay");
        }
        if untracked.len() == atom.len() {
            return State::with_atom(target, untracked);
        }

        let t = secs_per_timestep as f64 * delta as f64;
        let scaled = info.scaled(-t);
        let n1 = solver.solve(&scaled, &n0);

        let mut decayed: CompMap = info
            .nucids
            .iter()
            .zip(n1)
            .filter(|(_, qty)| *qty > 0.0)
            .map(|(&nuc, qty)| (nuc, qty))
            .collect();
        decayed.extend(untracked);
        State::with_atom(target, decayed)
    }

    /// Emit this composition's normalized mass fractions to `sink`, once.
    ///
    /// Later calls are no-ops. The flag is set before any row is emitted.
    pub fn record(&self, sink: &dyn Recorder) {
        if self.state.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut fractions = self.mass().clone();
        comp_math::normalize(&mut fractions, 1.0);
        for (nuc, frac) in fractions {
            sink.new_datum(COMPOSITIONS_TABLE)
                .add_val("QualId", self.id())
                .add_val("NucId", nuc)
                .add_val("MassFrac", frac)
                .record();
        }
    }
}

/// Nuclides must be valid and quantities strictly positive.
fn validate(v: &CompMap) -> Result<(), CompositionError> {
    for (&nuc, &qty) in v {
        if !nuclide::is_nuclide(nuc) {
            return Err(CompositionError::InvalidNuclide(nuc));
        }
        if !(qty > 0.0) {
            return Err(CompositionError::NonPositiveQuantity { nuc, qty });
        }
    }
    Ok(())
}

impl PartialEq for Composition {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for Composition {}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("id", &self.state.id)
            .field("offset", &self.state.offset)
            .field("mass", &self.state.mass.get())
            .field("atom", &self.state.atom.get())
            .finish()
    }
}

/// One `nuclide: mass` line per entry.
impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (&nuc, qty) in self.mass() {
            writeln!(f, "{}: {qty:.6}", nuclide::name(nuc))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{DecayEntry, DecayLibrary};
    use crate::solver::ExpmSolver;
    use fuelflow_core::constants::SECS_PER_YEAR;
    use fuelflow_core::nuclide::Nuc;
    use fuelflow_core::recorder::{MemoryRecorder, Value};
    use proptest::prelude::*;

    const U235: Nuc = 922350000;
    const U238: Nuc = 922380000;
    const CS137: Nuc = 551370000;
    const BA137: Nuc = 561370000;
    const K40: Nuc = 190400000;
    const CA40: Nuc = 200400000;
    const AR40: Nuc = 180400000;
    const FE56: Nuc = 260560000;

    fn cm(entries: &[(Nuc, f64)]) -> CompMap {
        entries.iter().copied().collect()
    }

    fn rel_close(a: f64, b: f64, tol: f64) -> bool {
        ((a - b) / b).abs() < tol
    }

    // --- creation ---

    #[test]
    fn create_rejects_invalid_nuclide() {
        let err = Composition::create_from_mass(cm(&[(42, 1.0)])).unwrap_err();
        assert_eq!(err, CompositionError::InvalidNuclide(42));
    }

    #[test]
    fn create_rejects_non_positive() {
        let err = Composition::create_from_atom(cm(&[(U235, 0.0)])).unwrap_err();
        assert!(matches!(err, CompositionError::NonPositiveQuantity { nuc: U235, .. }));
        let err = Composition::create_from_atom(cm(&[(U235, -3.0)])).unwrap_err();
        assert!(matches!(err, CompositionError::NonPositiveQuantity { .. }));
        let err = Composition::create_from_atom(cm(&[(U235, f64::NAN)])).unwrap_err();
        assert!(matches!(err, CompositionError::NonPositiveQuantity { .. }));
    }

    #[test]
    fn root_sits_at_offset_zero_of_new_chain() {
        let c = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        assert_eq!(c.offset(), 0);
        assert_eq!(c.chain().offsets(), vec![0]);
        let d = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        assert!(!c.same_lineage(&d));
        assert_ne!(c, d);
    }

    #[test]
    fn clones_are_the_same_instance() {
        let c = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        let copy = c.clone();
        assert!(c.same_instance(&copy));
        assert!(c.same_instance(&c.decay(0)));
        assert!(!c.same_instance(&c.decay(1)));
    }

    // --- basis conversion ---

    #[test]
    fn mass_to_atom_u235() {
        let c = Composition::create_from_mass(cm(&[(U235, 100.0)])).unwrap();
        let expected = 100.0 / 235.043_929_9;
        assert!(rel_close(c.atom()[&U235], expected, 1e-6));
    }

    #[test]
    fn lazy_basis_is_cached() {
        let c = Composition::create_from_atom(cm(&[(U235, 1.0), (U238, 2.0)])).unwrap();
        let first = c.mass() as *const CompMap;
        let second = c.mass() as *const CompMap;
        assert_eq!(first, second);
        // the native basis is returned untouched
        assert_eq!(c.atom(), &cm(&[(U235, 1.0), (U238, 2.0)]));
    }

    #[test]
    fn basis_conversion_does_not_touch_chain() {
        let c = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        let _ = c.atom();
        assert_eq!(c.chain().len(), 1);
    }

    // --- decay ---

    #[test]
    fn decay_zero_returns_root() {
        let c = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        assert_eq!(c.decay(0), c);
    }

    #[test]
    fn repeated_decay_hits_cache() {
        let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
        let a = c.decay(12);
        let b = c.decay(12);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.offset(), 12);
        assert!(a.same_lineage(&c));
        assert_eq!(c.chain().offsets(), vec![0, 12]);
    }

    #[test]
    fn stepwise_and_direct_decay_agree() {
        let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
        let stepwise = c.decay(5).decay(7);
        let direct = c.decay(12);
        assert_eq!(stepwise.id(), direct.id());
        assert_eq!(stepwise.atom(), direct.atom());
    }

    #[test]
    fn derived_member_sees_cache() {
        let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
        let direct = c.decay(10);
        let via = c.decay(4).decay(6);
        assert_eq!(direct, via);
    }

    #[test]
    fn cesium_half_life() {
        let c = Composition::create_from_atom(cm(&[(CS137, 1.0)])).unwrap();
        let secs = (30.08 * SECS_PER_YEAR).round() as u64;
        let d = c.decay_with_timestep(1, secs);
        assert!(rel_close(d.atom()[&CS137], 0.5, 1e-6));
        assert!(rel_close(d.atom()[&BA137], 0.5, 1e-6));
    }

    #[test]
    fn branching_ratio_is_respected() {
        let c = Composition::create_from_atom(cm(&[(K40, 1.0)])).unwrap();
        let d = c.decay_with_timestep(1, (1.248e9 * SECS_PER_YEAR) as u64);
        let ratio = d.atom()[&CA40] / d.atom()[&AR40];
        assert!(rel_close(ratio, 0.8928 / 0.1072, 1e-9));
    }

    #[test]
    fn untracked_nuclides_pass_through() {
        let c = Composition::create_from_atom(cm(&[(FE56, 2.0), (CS137, 1.0)])).unwrap();
        let d = c.decay(120);
        assert_eq!(d.atom()[&FE56], 2.0);
        assert!(d.atom()[&CS137] < 1.0);

        let only = Composition::create_from_atom(cm(&[(FE56, 2.0)])).unwrap();
        assert_eq!(only.decay(3).atom(), &cm(&[(FE56, 2.0)]));
    }

    #[test]
    fn offsets_saturate_instead_of_wrapping() {
        let c = Composition::create_from_atom(cm(&[(FE56, 2.0)])).unwrap();
        let far = c.decay(u64::MAX - 1);
        assert_eq!(far.offset(), u64::MAX - 1);

        let end = far.decay(5);
        assert_eq!(end.offset(), u64::MAX);
        assert!(end.same_instance(&far.decay(1)));
        assert!(end.same_instance(&end.decay(u64::MAX)));
        assert_eq!(c.chain().offsets(), vec![0, u64::MAX - 1, u64::MAX]);
    }

    #[test]
    fn empty_composition_decays_to_empty() {
        let c = Composition::create_from_atom(CompMap::new()).unwrap();
        let d = c.decay(5);
        assert!(d.atom().is_empty());
        assert!(d.mass().is_empty());
        assert_eq!(d.offset(), 5);
        assert_eq!(c.decay(5), d);
    }

    #[test]
    fn decay_from_mass_root_forces_atom_basis() {
        let c = Composition::create_from_mass(cm(&[(CS137, 137.0)])).unwrap();
        let d = c.decay(1);
        assert!(d.atom()[&CS137] > 0.0);
        assert!(d.atom()[&CS137] < c.atom()[&CS137]);
    }

    #[test]
    fn explicit_solver_is_bound_to_lineage() {
        let lib = DecayLibrary::from_entries(vec![
            DecayEntry::stable(BA137),
            // artificially short half-life: one timestep
            DecayEntry::radioactive(CS137, 100.0, &[(BA137, 1.0)]),
        ])
        .unwrap();
        let solver: Arc<dyn TransmutationSolver> = Arc::new(ExpmSolver::from_library(&lib));
        let c = Composition::create_with_solver(Basis::Atom, cm(&[(CS137, 1.0)]), solver.clone())
            .unwrap();
        let d = c.decay_with_timestep(1, 100);
        assert!(Arc::ptr_eq(d.chain().solver(), &solver));
        assert!(rel_close(d.atom()[&CS137], 0.5, 1e-9));
    }

    #[test]
    fn ids_strictly_increase() {
        let a = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        let b = a.decay(1);
        let c = Composition::create_from_atom(cm(&[(U238, 1.0)])).unwrap();
        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
        assert!(peek_next_id() > c.id());
    }

    #[test]
    fn concurrent_decay_inserts_once() {
        let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
        let ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| c.decay(24).id())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(c.chain().len(), 2);
    }

    // --- record ---

    #[test]
    fn record_emits_mass_fractions_once() {
        let sink = MemoryRecorder::new();
        let c = Composition::create_from_mass(cm(&[(U235, 1.0), (U238, 3.0)])).unwrap();
        assert!(!c.recorded());
        c.record(&sink);
        c.record(&sink);
        assert!(c.recorded());

        let rows = sink.rows_in(COMPOSITIONS_TABLE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("QualId"), Some(&Value::Int(c.id() as i64)));
        assert_eq!(rows[0].get("NucId"), Some(&Value::Int(U235 as i64)));
        assert_eq!(rows[0].get("MassFrac"), Some(&Value::Float(0.25)));
        assert_eq!(rows[1].get("MassFrac"), Some(&Value::Float(0.75)));
    }

    #[test]
    fn record_is_per_composition() {
        let sink = MemoryRecorder::new();
        let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
        let d = c.decay(1);
        c.record(&sink);
        d.record(&sink);
        c.clone().record(&sink);
        // CS137 alone, then CS137 + BA137
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn display_lists_mass_basis() {
        let c = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
        assert_eq!(c.to_string(), "U235: 1.000000\n");
    }

    proptest! {
        #[test]
        fn atom_mass_atom_roundtrip(q235 in 1e-3f64..1e3, q238 in 1e-3f64..1e3) {
            let atom = cm(&[(U235, q235), (U238, q238)]);
            let c = Composition::create_from_atom(atom.clone()).unwrap();
            let back = Composition::create_from_mass(c.mass().clone()).unwrap();
            prop_assert!(comp_math::almost_eq(back.atom(), &atom, 1e-12));
        }

        #[test]
        fn cache_coherent_for_any_split(a in 0u64..30, b in 0u64..30) {
            let c = Composition::create_from_mass(cm(&[(CS137, 1.0)])).unwrap();
            let split = c.decay(a).decay(b);
            let direct = c.decay(a + b);
            prop_assert_eq!(split.id(), direct.id());
        }

        #[test]
        fn ids_monotonic(n in 1usize..20) {
            let mut last = 0;
            let root = Composition::create_from_mass(cm(&[(U235, 1.0)])).unwrap();
            for step in 1..=n as u64 {
                let c = root.decay(step);
                prop_assert!(c.id() > last);
                last = c.id();
            }
        }
    }
}
