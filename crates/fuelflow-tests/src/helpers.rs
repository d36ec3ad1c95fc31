//! Shared fixtures and a minimal greedy exchange for integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use fuelflow_core::comp_math::CompMap;
use fuelflow_core::constants::EPS;
use fuelflow_core::error::PolicyError;
use fuelflow_core::nuclide;
use fuelflow_core::recorder::MemoryRecorder;
use fuelflow_decay::Composition;
use fuelflow_market::{CommodMap, Context, Material, Request, ResBuf, Trade, TradeResponse, Trader};

/// Mass-basis composition from `(name, mass)` pairs such as `("U235", 5.0)`.
pub fn comp(entries: &[(&str, f64)]) -> Composition {
    let v: CompMap = entries
        .iter()
        .map(|&(name, qty)| (nuclide::parse(name).unwrap(), qty))
        .collect();
    Composition::create_from_mass(v).unwrap()
}

/// Low-enriched fresh fuel.
pub fn leu() -> Composition {
    comp(&[("U235", 4.5), ("U238", 95.5)])
}

/// Spent fuel with short- and long-lived fission products.
pub fn spent_fuel() -> Composition {
    comp(&[
        ("U235", 0.8),
        ("U238", 93.0),
        ("Pu239", 0.6),
        ("Pu241", 0.12),
        ("Cs137", 0.15),
        ("Sr90", 0.06),
        ("I131", 0.001),
    ])
}

/// Context backed by an in-memory recorder the test can inspect.
pub fn context() -> (Arc<Context>, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::new());
    let ctx = Arc::new(Context::with_recorder(recorder.clone()));
    (ctx, recorder)
}

/// Unbounded buffer holding one material.
pub fn stocked_buffer(qty: f64, comp: Composition) -> Arc<Mutex<ResBuf>> {
    let mut buf = ResBuf::new();
    buf.push(Material::new(qty, comp).unwrap()).unwrap();
    Arc::new(Mutex::new(buf))
}

pub fn request(commodity: &str, qty: f64, comp: Composition, requester: &str) -> Request {
    Request::new(commodity, Material::new(qty, comp).unwrap(), requester)
}

/// Clear one round: every registered trader bids on `requests`, bids are
/// awarded first-come, and each trader settles its own trades.
///
/// Exclusive bids are awarded whole or not at all. Awards respect the
/// remaining request quantity and each portfolio's capacity.
pub fn run_exchange(
    ctx: &Context,
    traders: &[&dyn Trader],
    requests: &CommodMap,
) -> Result<Vec<TradeResponse>, PolicyError> {
    let mut wanted: BTreeMap<u64, f64> = requests
        .values()
        .flatten()
        .map(|r| (r.id, r.target.quantity()))
        .collect();

    let mut responses = Vec::new();
    for trader in traders.iter().filter(|t| ctx.is_registered(t.trader_id())) {
        let mut trades = Vec::new();
        for port in trader.get_matl_bids(requests)? {
            let mut capacity = port.capacity();
            for bid in &port.bids {
                let Some(want) = wanted.get_mut(&bid.request.id) else {
                    continue;
                };
                let offer = bid.offer.quantity();
                let amt = if bid.exclusive {
                    if offer <= *want + EPS && offer <= capacity + EPS {
                        offer
                    } else {
                        0.0
                    }
                } else {
                    offer.min(*want).min(capacity)
                };
                if amt <= EPS {
                    continue;
                }
                *want -= amt;
                capacity -= amt;
                trades.push(Trade::new(Arc::clone(bid), amt));
            }
        }
        trader.get_matl_trades(&trades, &mut responses)?;
    }
    Ok(responses)
}

/// Total quantity delivered across responses.
pub fn delivered(responses: &[TradeResponse]) -> f64 {
    responses.iter().map(|(_, m)| m.quantity()).sum()
}
