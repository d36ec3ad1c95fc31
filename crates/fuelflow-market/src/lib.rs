//! # fuelflow-market: Materials and the sell-side trading protocol.
//!
//! # Modules
//!
//! - [`material`]: quantity plus composition, split/mix/decay
//! - [`buffer`]: `ResBuf`, FIFO inventory with tolerant quantity pops
//! - [`package`]: fill ranges and strategies for deliverable containers
//! - [`exchange`]: requests, bids, portfolios and trades
//! - [`context`]: clock, package and trader registries, agent binding
//! - [`traits`]: `Trader` capability the exchange drives
//! - [`sell_policy`]: offers a buffer's contents and settles trades

pub mod buffer;
pub mod context;
pub mod exchange;
pub mod material;
pub mod package;
pub mod sell_policy;
pub mod traits;

pub use buffer::ResBuf;
pub use context::{Agent, Context};
pub use exchange::{
    commod_map, Bid, BidPortfolio, CapacityConstraint, CommodMap, Request, Trade, TradeResponse,
};
pub use material::Material;
pub use package::{FillStrategy, Package};
pub use sell_policy::{SellPolicy, SellPolicyConfig};
pub use traits::Trader;
