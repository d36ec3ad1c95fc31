//! Objects passed between traders and the exchange in one round.
//!
//! The exchange gathers [`Request`]s by commodity, collects
//! [`BidPortfolio`]s from traders, matches them into [`Trade`]s and hands
//! those back to the bidders for settlement.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::material::Material;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// A request for material on a commodity.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: u64,
    pub commodity: String,
    /// Desired quantity and composition.
    pub target: Material,
    pub requester: String,
    pub preference: f64,
    /// Whether the request must be filled whole.
    pub exclusive: bool,
}

impl Request {
    pub fn new(
        commodity: impl Into<String>,
        target: Material,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            commodity: commodity.into(),
            target,
            requester: requester.into(),
            preference: 1.0,
            exclusive: false,
        }
    }

    pub fn with_preference(mut self, preference: f64) -> Self {
        self.preference = preference;
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

/// An offer answering one request.
#[derive(Debug, Clone)]
pub struct Bid {
    pub request: Arc<Request>,
    pub offer: Material,
    pub bidder: String,
    /// Exclusive offers are atomic lots; the exchange may not split them.
    pub exclusive: bool,
}

/// Upper bound on the total quantity awarded across a portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityConstraint {
    pub capacity: f64,
}

impl CapacityConstraint {
    pub fn new(capacity: f64) -> Self {
        Self { capacity }
    }
}

/// A trader's bids for one round, bounded by its constraints.
#[derive(Debug, Clone, Default)]
pub struct BidPortfolio {
    pub bidder: String,
    pub bids: Vec<Arc<Bid>>,
    pub constraints: Vec<CapacityConstraint>,
}

impl BidPortfolio {
    pub fn new(bidder: impl Into<String>) -> Self {
        Self {
            bidder: bidder.into(),
            ..Self::default()
        }
    }

    pub fn add_bid(
        &mut self,
        request: Arc<Request>,
        offer: Material,
        exclusive: bool,
    ) -> Arc<Bid> {
        let bid = Arc::new(Bid {
            request,
            offer,
            bidder: self.bidder.clone(),
            exclusive,
        });
        self.bids.push(Arc::clone(&bid));
        bid
    }

    pub fn add_constraint(&mut self, constraint: CapacityConstraint) {
        self.constraints.push(constraint);
    }

    /// Tightest capacity across all constraints.
    pub fn capacity(&self) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.capacity)
            .fold(f64::INFINITY, f64::min)
    }

    /// Sum of all offered quantities.
    pub fn offered(&self) -> f64 {
        self.bids.iter().map(|b| b.offer.quantity()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}

/// A matched bid and the quantity awarded to it.
#[derive(Debug, Clone)]
pub struct Trade {
    pub request: Arc<Request>,
    pub bid: Arc<Bid>,
    pub amt: f64,
}

impl Trade {
    pub fn new(bid: Arc<Bid>, amt: f64) -> Self {
        Self {
            request: Arc::clone(&bid.request),
            bid,
            amt,
        }
    }
}

/// Pending requests grouped by commodity.
pub type CommodMap = BTreeMap<String, Vec<Arc<Request>>>;

/// A settled trade with the material delivered for it.
pub type TradeResponse = (Trade, Material);

/// Group requests by their commodity.
pub fn commod_map(requests: impl IntoIterator<Item = Request>) -> CommodMap {
    let mut map = CommodMap::new();
    for req in requests {
        map.entry(req.commodity.clone())
            .or_default()
            .push(Arc::new(req));
    }
    map
}
