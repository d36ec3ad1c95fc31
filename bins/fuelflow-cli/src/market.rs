//! Driving a sell scenario period by period.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use fuelflow_core::constants::EPS;
use fuelflow_decay::Composition;
use fuelflow_market::{
    commod_map, Agent, CommodMap, Context, Material, Request, ResBuf, SellPolicy, Trade,
    TradeResponse, Trader,
};

use crate::scenario::{comp_map, ScenarioConfig};

/// What one period moved.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub time: u64,
    pub offered: f64,
    pub delivered: f64,
    pub trades: usize,
    pub remaining: f64,
}

/// Build the seller from `cfg`, then run `cfg.periods` rounds against the
/// standing requests. Delivered material is decayed to its delivery time and
/// its composition recorded.
pub fn run_scenario(cfg: &ScenarioConfig, ctx: &Arc<Context>) -> Result<Vec<PeriodSummary>> {
    for package in &cfg.packages {
        ctx.add_package(package.clone())
            .with_context(|| format!("package {}", package.name()))?;
    }

    let stock = Composition::create_from_mass(comp_map(&cfg.inventory.composition)?)
        .context("inventory composition")?;
    let mut buf = ResBuf::new();
    buf.push(Material::new(cfg.inventory.quantity, stock.clone())?)?;
    let buf = Arc::new(Mutex::new(buf));

    let agent = Agent::new("Seller", Arc::clone(ctx));
    let policy = SellPolicy::from_config(&cfg.seller, agent, Arc::clone(&buf))?;
    policy.start()?;

    let mut summaries = Vec::with_capacity(cfg.periods as usize);
    for _ in 0..cfg.periods {
        let requests = standing_requests(cfg, &stock)?;
        let offered = policy.limit();
        let responses = clear_round(&policy, &requests)?;

        let time = ctx.time();
        for (trade, mat) in &responses {
            let mut mat = mat.clone();
            mat.decay(time, ctx.dt());
            mat.comp().record(ctx.recorder());
            debug!(requester = %trade.request.requester, qty = mat.quantity(), "delivered");
        }

        let summary = PeriodSummary {
            time,
            offered,
            delivered: responses.iter().map(|(_, m)| m.quantity()).sum(),
            trades: responses.len(),
            remaining: buf.lock().quantity(),
        };
        info!(
            time,
            delivered = summary.delivered,
            remaining = summary.remaining,
            "period cleared"
        );
        summaries.push(summary);
        ctx.advance();
    }

    policy.stop()?;
    Ok(summaries)
}

fn standing_requests(cfg: &ScenarioConfig, stock: &Composition) -> Result<CommodMap> {
    let mut requests = Vec::with_capacity(cfg.requests.len());
    for r in &cfg.requests {
        let comp = match &r.composition {
            Some(named) => Composition::create_from_mass(comp_map(named)?)?,
            None => stock.clone(),
        };
        let target = Material::new(r.quantity, comp)?;
        requests.push(Request::new(&r.commodity, target, &r.requester));
    }
    Ok(commod_map(requests))
}

/// Award bids in order until each request or portfolio capacity is used
/// up, then have the trader settle.
///
/// Exclusive bids are taken whole or skipped.
pub fn clear_round(trader: &dyn Trader, requests: &CommodMap) -> Result<Vec<TradeResponse>> {
    let mut open: BTreeMap<u64, f64> = requests
        .values()
        .flatten()
        .map(|r| (r.id, r.target.quantity()))
        .collect();

    let mut trades = Vec::new();
    for port in trader.get_matl_bids(requests)? {
        let mut capacity = port.capacity();
        for bid in &port.bids {
            let Some(open_qty) = open.get_mut(&bid.request.id) else {
                continue;
            };
            let room = open_qty.min(capacity);
            let amt = match bid.exclusive {
                true if bid.offer.quantity() <= room + EPS => bid.offer.quantity(),
                true => continue,
                false => bid.offer.quantity().min(room),
            };
            if amt <= EPS {
                continue;
            }
            *open_qty -= amt;
            capacity -= amt;
            trades.push(Trade::new(Arc::clone(bid), amt));
        }
    }

    let mut responses = Vec::with_capacity(trades.len());
    trader.get_matl_trades(&trades, &mut responses)?;
    Ok(responses)
}
