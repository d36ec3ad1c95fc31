//! Trait interfaces for market participants.
//!
//! - [`Trader`]: answers requests with bids and settles awarded trades
//!   ([`SellPolicy`](crate::sell_policy::SellPolicy) implements)
//!
//! The exchange drives traders through this capability alone; it never
//! needs to know which concrete agent type sits behind a trader.

use fuelflow_core::error::PolicyError;

use crate::exchange::{BidPortfolio, CommodMap, Trade, TradeResponse};

/// A participant in the material exchange.
pub trait Trader: Send + Sync {
    /// Key the trader is registered under in its [`Context`](crate::context::Context).
    fn trader_id(&self) -> u64;

    /// Display name used in bids and logs.
    fn trader_name(&self) -> &str;

    /// Bid portfolios answering this round's requests.
    fn get_matl_bids(&self, requests: &CommodMap) -> Result<Vec<BidPortfolio>, PolicyError>;

    /// Deliver material for each awarded trade, appending one response per
    /// trade in input order.
    fn get_matl_trades(
        &self,
        trades: &[Trade],
        responses: &mut Vec<TradeResponse>,
    ) -> Result<(), PolicyError>;
}
