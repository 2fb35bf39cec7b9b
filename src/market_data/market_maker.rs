use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::engine::gateway::{CancelOutcome, OrderGateway};
use crate::engine::open_orders::OpenOrderBook;
use crate::engine::types::{AskFillRule, Asset, EngineError, Fill, Inventory, OpenOrder, Side};
use crate::market_data::external_book::OrderBookSnapshot;
use crate::market_data::normaliser::DataError;

/// Decimal places kept on quoted prices, amounts and sampled fractions.
/// Keeps every later add/subtract exact, so cancelling restores balances to the unit.
pub const QUOTE_SCALE: u32 = 8;

/// Uniform range an offset below the reference price is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetBand {
    pub lo: f64,
    pub hi: f64,
}

impl OffsetBand {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

pub fn default_bands() -> Vec<OffsetBand> {
    vec![
        OffsetBand::new(0.0001, 0.01),
        OffsetBand::new(0.011, 0.02),
        OffsetBand::new(0.021, 0.03),
        OffsetBand::new(0.031, 0.04),
        OffsetBand::new(0.041, 0.05),
    ]
}

// Share of a balance put at risk in one quoting round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionRange {
    pub min: f64,
    pub max: f64,
}

impl Default for FractionRange {
    fn default() -> Self {
        Self { min: 0.16, max: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuotingParams {
    pub risk: FractionRange,
    pub bands: Vec<OffsetBand>, // one order per band per side
    pub ask_fill_rule: AskFillRule,
}

impl Default for QuotingParams {
    fn default() -> Self {
        Self { risk: FractionRange::default(), bands: default_bands(), ask_fill_rule: AskFillRule::default() }
    }
}

impl QuotingParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        let FractionRange { min, max } = self.risk;
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max && max <= 1.0) {
            return Err(EngineError::InvalidParams(format!("risk fractions must satisfy 0 < min <= max <= 1, got {min}..{max}")));
        }
        if self.bands.is_empty() {
            return Err(EngineError::InvalidParams("at least one ladder band is required".into()));
        }
        for (i, b) in self.bands.iter().enumerate() {
            if !(b.lo.is_finite() && b.hi.is_finite() && b.lo >= 0.0 && b.lo < b.hi && b.hi < 1.0) {
                return Err(EngineError::InvalidParams(format!("band {i} must satisfy 0 <= lo < hi < 1, got {}..{}", b.lo, b.hi)));
            }
        }
        for (i, pair) in self.bands.windows(2).enumerate() {
            if pair[0].hi >= pair[1].lo {
                return Err(EngineError::InvalidParams(format!(
                    "bands {} and {} overlap or are out of order ({} >= {})",
                    i,
                    i + 1,
                    pair[0].hi,
                    pair[1].lo
                )));
            }
        }
        Ok(())
    }
}

/// Owns balances and the synthetic open orders. One cycle is
/// `settle` -> `cancel_all` -> `quote`, always in that order.
#[derive(Debug)]
pub struct MarketMakerEngine<G: OrderGateway> {
    inventory: Inventory,
    open_orders: OpenOrderBook,
    params: QuotingParams,
    gateway: G,
    rng: StdRng,
}

impl<G: OrderGateway> MarketMakerEngine<G> {
    pub fn new(inventory: Inventory, params: QuotingParams, gateway: G, rng: StdRng) -> Result<Self, EngineError> {
        params.validate()?;
        if inventory.base < Decimal::ZERO || inventory.quote < Decimal::ZERO {
            return Err(EngineError::InvalidParams(format!(
                "initial balances must not be negative (base {}, quote {})",
                inventory.base, inventory.quote
            )));
        }
        info!(base = %inventory.base, quote = %inventory.quote, levels = params.bands.len(), "market maker ready");
        Ok(Self { inventory, open_orders: OpenOrderBook::new(), params, gateway, rng })
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn open_orders(&self) -> &OpenOrderBook {
        &self.open_orders
    }

    pub fn params(&self) -> &QuotingParams {
        &self.params
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Settle every open order the market has moved through.
    /// Filled bids credit base, filled asks credit quote; the reserve is consumed.
    #[instrument(level = "debug", skip_all, fields(open = self.open_orders.len()))]
    pub fn settle(&mut self, snapshot: &OrderBookSnapshot) -> Vec<Fill> {
        if self.open_orders.is_empty() {
            debug!("nothing to settle");
            return Vec::new();
        }

        let mut fills = Vec::new();
        for order in self.open_orders.snapshot() {
            if !self.is_filled(&order, snapshot) {
                continue;
            }
            if self.open_orders.remove(order.id).is_none() {
                continue;
            }
            let (credited, value) = match order.side {
                Side::Bid => (Asset::Base, order.amount),
                Side::Ask => (Asset::Quote, order.notional()),
            };
            self.inventory.credit(credited, value);
            self.gateway.acknowledge_fill(order.id);
            debug!(id = %order.id, side = %order.side, price = %order.price, amount = %order.amount, %credited, %value, "order filled");
            fills.push(Fill { order, credited, value });
        }
        fills
    }

    fn is_filled(&self, order: &OpenOrder, snapshot: &OrderBookSnapshot) -> bool {
        match order.side {
            Side::Bid => order.price < snapshot.best_bid,
            Side::Ask => match self.params.ask_fill_rule {
                AskFillRule::BestBid => order.price > snapshot.best_bid,
                AskFillRule::BestAsk => order.price > snapshot.best_ask,
            },
        }
    }

    /// Pull every remaining order and hand its reserve back. Leaves the book empty.
    #[instrument(level = "debug", skip_all, fields(open = self.open_orders.len()))]
    pub fn cancel_all(&mut self) -> Vec<OpenOrder> {
        if self.open_orders.is_empty() {
            return Vec::new();
        }

        let cancelled = self.open_orders.drain();
        for order in &cancelled {
            if self.gateway.cancel(order.id) == CancelOutcome::NotFound {
                // local book is authoritative in simulation
                warn!(id = %order.id, "gateway did not know order, restoring reserve anyway");
            }
            self.inventory.credit(order.reserved_asset(), order.reserved_value);
        }
        debug!(cancelled = cancelled.len(), base = %self.inventory.base, quote = %self.inventory.quote, "cancelled open orders");
        cancelled
    }

    /// Reject a snapshot this engine cannot settle and quote against, before
    /// anything is mutated: a reference price so small the deepest ladder
    /// price rounds to zero, or balances whose worst-case budget overflows.
    pub fn check_quotable(&self, snapshot: &OrderBookSnapshot) -> Result<(), DataError> {
        let deepest = self.params.bands.iter().map(|b| b.hi).fold(0.0, f64::max);
        let deepest = Decimal::from_f64(deepest)
            .map(|d| d.round_dp(QUOTE_SCALE))
            .ok_or(DataError::Overflow { context: "ladder depth" })?;
        for (side, reference) in [(Side::Ask, snapshot.best_ask), (Side::Bid, snapshot.best_bid)] {
            if (reference * (Decimal::ONE - deepest)).round_dp(QUOTE_SCALE) <= Decimal::ZERO {
                return Err(DataError::Unquotable { side, price: reference });
            }
        }

        // balances after every open order either fills or is cancelled
        let overflow = |context| DataError::Overflow { context };
        let (mut base, mut quote) = (self.inventory.base, self.inventory.quote);
        for o in self.open_orders.iter() {
            let (base_back, quote_back) = match o.side {
                Side::Bid => (o.amount, o.reserved_value),
                Side::Ask => (o.reserved_value, o.amount.checked_mul(o.price).ok_or(overflow("ask notional"))?),
            };
            base = base.checked_add(base_back).ok_or(overflow("base balance"))?;
            quote = quote.checked_add(quote_back).ok_or(overflow("quote balance"))?;
        }

        let max_fraction = Decimal::from_f64(self.params.risk.max)
            .map(|d| d.round_dp(QUOTE_SCALE))
            .ok_or(overflow("risk fraction"))?;
        let levels = Decimal::from(self.params.bands.len());
        base.checked_mul(max_fraction)
            .and_then(|v| v.checked_div(levels))
            .and_then(|v| v.checked_mul(snapshot.best_ask))
            .ok_or(overflow("ask budget"))?;
        quote
            .checked_mul(max_fraction)
            .and_then(|v| v.checked_div(levels))
            .and_then(|v| v.checked_div(snapshot.best_bid))
            .ok_or(overflow("bid budget"))?;
        Ok(())
    }

    /// Place one ask and one bid per ladder band below the reference prices.
    /// The whole ladder is sized and checked against both balances before the
    /// first order goes out.
    #[instrument(level = "debug", skip_all, fields(best_ask = %snapshot.best_ask, best_bid = %snapshot.best_bid))]
    pub fn quote(&mut self, snapshot: &OrderBookSnapshot) -> Result<Vec<OpenOrder>, EngineError> {
        for (side, price) in [(Side::Ask, snapshot.best_ask), (Side::Bid, snapshot.best_bid)] {
            if price <= Decimal::ZERO {
                return Err(EngineError::InvalidReference { side, price });
            }
        }

        let ladder = self.plan_ladder(snapshot)?;
        for asset in [Asset::Base, Asset::Quote] {
            let needed = ladder
                .iter()
                .filter(|o| o.side.reserved_asset() == asset)
                .try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.reserved_value))
                .ok_or(EngineError::Overflow { context: "ladder reserve" })?;
            let available = self.inventory.balance(asset);
            if needed > available {
                return Err(EngineError::InsufficientBalance { asset, needed, available });
            }
        }

        let mut placed = Vec::with_capacity(ladder.len());
        for o in ladder {
            placed.push(self.place(o.side, o.price, o.amount)?);
        }

        info!(placed = placed.len(), base = %self.inventory.base, quote = %self.inventory.quote, "quoted ladder");
        Ok(placed)
    }

    // Sizes and prices every order without touching balances.
    fn plan_ladder(&mut self, snapshot: &OrderBookSnapshot) -> Result<Vec<PlannedOrder>, EngineError> {
        let bands = self.params.bands.clone();
        let levels = Decimal::from(bands.len());
        let base_fraction = self.sample(self.params.risk.min, self.params.risk.max)?;
        let quote_fraction = self.sample(self.params.risk.min, self.params.risk.max)?;

        // rounded toward zero so N orders never add up to more than the budget
        let ask_amount = self
            .inventory
            .base
            .checked_mul(base_fraction)
            .and_then(|v| v.checked_div(levels))
            .map(round_amount)
            .ok_or(EngineError::Overflow { context: "ask amount" })?;
        // bid size is in base units, priced off the reference bid
        let bid_amount = self
            .inventory
            .quote
            .checked_mul(quote_fraction)
            .and_then(|v| v.checked_div(levels))
            .and_then(|v| v.checked_div(snapshot.best_bid))
            .map(round_amount)
            .ok_or(EngineError::Overflow { context: "bid amount" })?;
        debug!(%base_fraction, %quote_fraction, %ask_amount, %bid_amount, "sized ladder");

        let mut ladder = Vec::with_capacity(bands.len() * 2);
        for (side, reference, amount) in [(Side::Ask, snapshot.best_ask, ask_amount), (Side::Bid, snapshot.best_bid, bid_amount)] {
            if amount <= Decimal::ZERO {
                warn!(%side, balance = %self.inventory.balance(side.reserved_asset()), "budget rounds to zero, side not quoted");
                continue;
            }
            for band in &bands {
                let offset = self.sample(band.lo, band.hi)?;
                let price = (reference * (Decimal::ONE - offset)).round_dp(QUOTE_SCALE);
                let notional = amount.checked_mul(price).ok_or(EngineError::Overflow { context: "order notional" })?;
                let reserved_value = match side {
                    Side::Bid => notional,
                    Side::Ask => amount,
                };
                ladder.push(PlannedOrder { side, price, amount, reserved_value });
            }
        }
        Ok(ladder)
    }

    // Debit first, then submit; the order only goes live once its reserve is held.
    fn place(&mut self, side: Side, price: Decimal, amount: Decimal) -> Result<OpenOrder, EngineError> {
        let reserved_value = match side {
            Side::Bid => amount.checked_mul(price).ok_or(EngineError::Overflow { context: "order notional" })?,
            Side::Ask => amount,
        };
        let asset = side.reserved_asset();
        self.inventory.debit(asset, reserved_value)?;

        let id = match self.gateway.submit(side, price, amount) {
            Ok(id) => id,
            Err(e) => {
                self.inventory.credit(asset, reserved_value);
                return Err(e.into());
            }
        };

        let order = OpenOrder { id, side, price, amount, reserved_value };
        debug!(%id, %side, %price, %amount, %reserved_value, "placed order");
        self.open_orders.insert(order.clone());
        Ok(order)
    }

    fn sample(&mut self, lo: f64, hi: f64) -> Result<Decimal, EngineError> {
        let draw = self.rng.gen_range(lo..=hi);
        Decimal::from_f64(draw)
            .map(|d| d.round_dp(QUOTE_SCALE))
            .ok_or(EngineError::Sampling { draw })
    }
}

struct PlannedOrder {
    side: Side,
    price: Decimal,
    amount: Decimal,
    reserved_value: Decimal,
}

fn round_amount(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(QUOTE_SCALE, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gateway::SimulatedGateway;
    use crate::market_data::external_book::PriceLevel;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn snapshot(best_ask: Decimal, best_bid: Decimal) -> OrderBookSnapshot {
        OrderBookSnapshot::from_levels(vec![
            PriceLevel { price: best_ask, net_amount: dec!(2) },
            PriceLevel { price: best_ask + dec!(5), net_amount: dec!(1) },
            PriceLevel { price: best_bid, net_amount: dec!(-2) },
            PriceLevel { price: best_bid + dec!(3), net_amount: dec!(-1) },
        ])
        .unwrap()
    }

    fn engine_with(base: Decimal, quote: Decimal, params: QuotingParams) -> MarketMakerEngine<SimulatedGateway> {
        MarketMakerEngine::new(
            Inventory::new(base, quote),
            params,
            SimulatedGateway::new(StdRng::seed_from_u64(11)),
            StdRng::seed_from_u64(42),
        )
        .unwrap()
    }

    fn engine(base: Decimal, quote: Decimal) -> MarketMakerEngine<SimulatedGateway> {
        engine_with(base, quote, QuotingParams::default())
    }

    #[test]
    fn test_quote_scenario_balances() {
        let mut mm = engine(dec!(10), dec!(20000));
        let placed = mm.quote(&snapshot(dec!(1800), dec!(1790))).unwrap();

        let asks: Vec<_> = placed.iter().filter(|o| o.side == Side::Ask).collect();
        let bids: Vec<_> = placed.iter().filter(|o| o.side == Side::Bid).collect();
        assert_eq!(asks.len(), 5);
        assert_eq!(bids.len(), 5);
        assert_eq!(mm.open_orders().len(), 10);

        let ask_total: Decimal = asks.iter().map(|o| o.amount).sum();
        let bid_cost: Decimal = bids.iter().map(|o| o.amount * o.price).sum();
        assert_eq!(mm.inventory().base, dec!(10) - ask_total);
        assert_eq!(mm.inventory().quote, dec!(20000) - bid_cost);

        // never more than the max risk fraction of either balance
        assert!(ask_total <= dec!(2.5));
        assert!(bid_cost <= dec!(5000));
        assert!(ask_total >= dec!(1.59));
    }

    #[test]
    fn test_quote_amounts_positive_and_equal_per_side() {
        let mut mm = engine(dec!(10), dec!(20000));
        let placed = mm.quote(&snapshot(dec!(1800), dec!(1790))).unwrap();
        assert!(placed.iter().all(|o| o.amount > Decimal::ZERO && o.price > Decimal::ZERO));
        for side in [Side::Ask, Side::Bid] {
            let amounts: Vec<_> = placed.iter().filter(|o| o.side == side).map(|o| o.amount).collect();
            assert!(amounts.windows(2).all(|w| w[0] == w[1]));
        }
        for o in &placed {
            let expected = match o.side {
                Side::Bid => o.amount * o.price,
                Side::Ask => o.amount,
            };
            assert_eq!(o.reserved_value, expected);
        }
    }

    #[test]
    fn test_ladder_moves_away_from_reference() {
        let mut mm = engine(dec!(10), dec!(20000));
        let snap = snapshot(dec!(1800), dec!(1790));
        let placed = mm.quote(&snap).unwrap();

        for (side, reference) in [(Side::Ask, snap.best_ask), (Side::Bid, snap.best_bid)] {
            let prices: Vec<_> = placed.iter().filter(|o| o.side == side).map(|o| o.price).collect();
            assert!(prices.windows(2).all(|w| w[0] > w[1]), "{side} ladder not decreasing: {prices:?}");
            assert!(prices[0] < reference);
            assert!(*prices.last().unwrap() >= reference * dec!(0.95));
        }
    }

    #[test]
    fn test_place_then_cancel_restores_inventory() {
        let mut mm = engine(dec!(10), dec!(20000));
        let before = mm.inventory();
        mm.quote(&snapshot(dec!(1800.37), dec!(1790.11))).unwrap();
        assert_ne!(mm.inventory(), before);

        let cancelled = mm.cancel_all();
        assert_eq!(cancelled.len(), 10);
        assert!(mm.open_orders().is_empty());
        assert_eq!(mm.inventory(), before);
        assert_eq!(mm.gateway().live_orders(), 0);
    }

    #[test]
    fn test_cancel_all_idempotent() {
        let mut mm = engine(dec!(10), dec!(20000));
        mm.quote(&snapshot(dec!(1800), dec!(1790))).unwrap();
        mm.cancel_all();
        let after_first = mm.inventory();
        assert!(mm.cancel_all().is_empty());
        assert_eq!(mm.inventory(), after_first);
    }

    #[test]
    fn test_bid_filled_when_best_bid_rises_above_it() {
        let mut mm = engine(dec!(10), dec!(20000));
        let bid = mm.place(Side::Bid, dec!(1750), dec!(0.5)).unwrap();
        assert_eq!(mm.inventory().quote, dec!(20000) - dec!(875));

        let fills = mm.settle(&snapshot(dec!(1770), dec!(1760)));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order.id, bid.id);
        assert_eq!(fills[0].credited, Asset::Base);
        assert!(mm.open_orders().is_empty());
        assert_eq!(mm.inventory().base, dec!(10.5));
        // the reserved quote is consumed by the trade
        assert_eq!(mm.inventory().quote, dec!(19125));
    }

    #[test]
    fn test_bid_at_or_above_best_bid_stays_open() {
        let mut mm = engine(dec!(10), dec!(20000));
        mm.place(Side::Bid, dec!(1760), dec!(0.5)).unwrap();
        assert!(mm.settle(&snapshot(dec!(1770), dec!(1760))).is_empty());
        assert_eq!(mm.open_orders().len(), 1);
    }

    #[test]
    fn test_ask_fill_credits_quote_only() {
        let mut mm = engine(dec!(10), dec!(20000));
        mm.place(Side::Ask, dec!(1795), dec!(2)).unwrap();
        let fills = mm.settle(&snapshot(dec!(1800), dec!(1790)));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].value, dec!(3590));
        assert_eq!(mm.inventory(), Inventory::new(dec!(8), dec!(23590)));
    }

    #[test]
    fn test_ask_fill_rule_best_ask() {
        let params = QuotingParams { ask_fill_rule: AskFillRule::BestAsk, ..QuotingParams::default() };
        let mut mm = engine_with(dec!(10), dec!(20000), params);
        mm.place(Side::Ask, dec!(1795), dec!(1)).unwrap();
        mm.place(Side::Ask, dec!(1805), dec!(1)).unwrap();

        let fills = mm.settle(&snapshot(dec!(1800), dec!(1790)));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order.price, dec!(1805));
        assert_eq!(mm.open_orders().iter().next().map(|o| o.price), Some(dec!(1795)));
    }

    #[test]
    fn test_settle_then_cancel_never_double_credits() {
        let mut mm = engine(dec!(10), dec!(20000));
        mm.place(Side::Bid, dec!(1750), dec!(1)).unwrap(); // fills
        mm.place(Side::Bid, dec!(1795), dec!(1)).unwrap(); // stays
        mm.place(Side::Ask, dec!(1700), dec!(1)).unwrap(); // stays, not above best bid

        let fills = mm.settle(&snapshot(dec!(1800), dec!(1760)));
        assert_eq!(fills.len(), 1);
        let cancelled = mm.cancel_all();
        assert_eq!(cancelled.len(), 2);
        assert!(cancelled.iter().all(|o| o.id != fills[0].order.id));

        // filled bid: -1750 quote, +1 base; the rest restored
        assert_eq!(mm.inventory(), Inventory::new(dec!(11), dec!(18250)));
    }

    #[test]
    fn test_first_cycle_has_nothing_to_settle_or_cancel() {
        let mut mm = engine(dec!(10), dec!(20000));
        let snap = snapshot(dec!(1800), dec!(1790));
        assert!(mm.settle(&snap).is_empty());
        assert!(mm.cancel_all().is_empty());
        assert_eq!(mm.inventory(), Inventory::new(dec!(10), dec!(20000)));
    }

    #[test]
    fn test_empty_base_skips_asks() {
        let mut mm = engine(Decimal::ZERO, dec!(20000));
        let placed = mm.quote(&snapshot(dec!(1800), dec!(1790))).unwrap();
        assert_eq!(placed.len(), 5);
        assert!(placed.iter().all(|o| o.side == Side::Bid));
    }

    #[test]
    fn test_overdraft_refused_without_mutation() {
        let mut mm = engine(dec!(1), dec!(100));
        let err = mm.place(Side::Bid, dec!(1790), dec!(1)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { asset: Asset::Quote, .. }));
        assert!(mm.open_orders().is_empty());
        assert_eq!(mm.inventory(), Inventory::new(dec!(1), dec!(100)));
    }

    #[test]
    fn test_many_cycles_keep_balances_non_negative() {
        let mut mm = engine(dec!(10), dec!(20000));
        let books = [
            snapshot(dec!(1800), dec!(1790)),
            snapshot(dec!(1810), dec!(1801)),
            snapshot(dec!(1780), dec!(1770)),
            snapshot(dec!(1795), dec!(1788)),
        ];
        for snap in books.iter().cycle().take(40) {
            mm.settle(snap);
            mm.cancel_all();
            mm.quote(snap).unwrap();
            let inv = mm.inventory();
            assert!(inv.base >= Decimal::ZERO && inv.quote >= Decimal::ZERO);
            assert_eq!(mm.open_orders().len(), 10);
        }
    }

    #[test]
    fn test_oversized_bid_budget_is_refused_before_mutation() {
        let mut mm = engine(dec!(10), Decimal::from_i128_with_scale(10i128.pow(28), 0));
        let snap = snapshot(dec!(0.002), dec!(0.001));
        assert!(matches!(mm.check_quotable(&snap), Err(DataError::Overflow { context: "bid budget" })));

        let before = mm.inventory();
        assert!(matches!(mm.quote(&snap), Err(EngineError::Overflow { .. })));
        assert_eq!(mm.inventory(), before);
        assert!(mm.open_orders().is_empty());
    }

    #[test]
    fn test_tiny_reference_price_is_unquotable() {
        let mm = engine(dec!(10), dec!(20000));
        let snap = snapshot(dec!(1800), dec!(0.000000001));
        assert!(matches!(
            mm.check_quotable(&snap),
            Err(DataError::Unquotable { side: Side::Bid, .. })
        ));
        assert!(mm.check_quotable(&snapshot(dec!(1800), dec!(1790))).is_ok());
    }

    #[test]
    fn test_full_risk_never_overdraws_small_balance() {
        let params = QuotingParams { risk: FractionRange { min: 1.0, max: 1.0 }, ..QuotingParams::default() };
        let mut mm = engine_with(dec!(0.00000009), dec!(0.00001), params);
        let placed = mm.quote(&snapshot(dec!(1800), dec!(1790))).unwrap();

        // 0.000000018 per order truncates to 0.00000001; the bid budget truncates to zero
        assert_eq!(placed.len(), 5);
        assert!(placed.iter().all(|o| o.side == Side::Ask && o.amount == dec!(0.00000001)));
        assert_eq!(mm.inventory(), Inventory::new(dec!(0.00000004), dec!(0.00001)));
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let overlapping = QuotingParams {
            bands: vec![OffsetBand::new(0.0001, 0.02), OffsetBand::new(0.011, 0.03)],
            ..QuotingParams::default()
        };
        assert!(matches!(overlapping.validate(), Err(EngineError::InvalidParams(_))));

        let unordered = QuotingParams {
            bands: vec![OffsetBand::new(0.021, 0.03), OffsetBand::new(0.0001, 0.01)],
            ..QuotingParams::default()
        };
        assert!(unordered.validate().is_err());

        let no_bands = QuotingParams { bands: vec![], ..QuotingParams::default() };
        assert!(no_bands.validate().is_err());

        let risky = QuotingParams { risk: FractionRange { min: 0.3, max: 0.2 }, ..QuotingParams::default() };
        assert!(risky.validate().is_err());

        assert!(QuotingParams::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_order_cancel_still_restores() {
        let mut mm = engine(dec!(10), dec!(20000));
        let order = mm.place(Side::Ask, dec!(1800), dec!(1)).unwrap();
        // the gateway forgets it behind our back
        mm.gateway.acknowledge_fill(order.id);
        mm.cancel_all();
        assert_eq!(mm.inventory(), Inventory::new(dec!(10), dec!(20000)));
        assert_eq!(mm.open_orders().get(order.id), None);
    }
}
