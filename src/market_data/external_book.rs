use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::types::Side;
use crate::market_data::normaliser::DataError;

// Aggregate of every raw record resting at one price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub net_amount: Decimal, // > 0 ask liquidity, < 0 bid liquidity
}

/// Normalized view of the exchange book for one cycle.
///
/// `best_*` is the lowest price on a side and `worst_*` the highest, so
/// `best_ask <= worst_ask` and `best_bid <= worst_bid` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBookSnapshot {
    pub asks: Vec<PriceLevel>, // sorted by price, ascending
    pub bids: Vec<PriceLevel>,
    pub best_ask: Decimal,
    pub worst_ask: Decimal,
    pub best_bid: Decimal,
    pub worst_bid: Decimal,
}

impl OrderBookSnapshot {
    /// Split aggregated levels into sides and pick the extrema.
    /// Levels netting to exactly zero belong to neither side and are dropped.
    pub fn from_levels<I>(levels: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = PriceLevel>,
    {
        let mut asks = Vec::new();
        let mut bids = Vec::new();
        for level in levels {
            if level.net_amount > Decimal::ZERO {
                asks.push(level);
            } else if level.net_amount < Decimal::ZERO {
                bids.push(level);
            }
        }

        let (best_ask, worst_ask) = extrema(&asks).ok_or(DataError::OneSidedBook { missing: Side::Ask })?;
        let (best_bid, worst_bid) = extrema(&bids).ok_or(DataError::OneSidedBook { missing: Side::Bid })?;

        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.sort_by(|a, b| a.price.cmp(&b.price));

        Ok(Self { asks, bids, best_ask, worst_ask, best_bid, worst_bid })
    }

    pub fn level(&self, side: Side, price: Decimal) -> Option<&PriceLevel> {
        let levels = match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        };
        levels.iter().find(|l| l.price == price)
    }
}

// (min, max) price in one pass
fn extrema(levels: &[PriceLevel]) -> Option<(Decimal, Decimal)> {
    let first = levels.first()?.price;
    Some(levels.iter().fold((first, first), |(lo, hi), l| (lo.min(l.price), hi.max(l.price))))
}
