//! Order-submission seam.
//!
//! Nothing here talks to an exchange. `SimulatedGateway` only hands out order
//! numbers and remembers which ones are live, which is enough for the engine to
//! run the full place / fill / cancel lifecycle locally.

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::engine::types::{OrderId, Side};

pub const ORDER_ID_MIN: u64 = 10_000_000;
pub const ORDER_ID_MAX: u64 = 99_999_999;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("order rejected: {reason}")]
    Rejected { reason: String },
    #[error("no free order ids left")]
    IdSpaceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotFound,
}

pub trait OrderGateway {
    fn submit(&mut self, side: Side, price: Decimal, amount: Decimal) -> Result<OrderId, GatewayError>;

    fn cancel(&mut self, id: OrderId) -> CancelOutcome;

    /// Called once an order has been settled as filled.
    fn acknowledge_fill(&mut self, _id: OrderId) {}
}

#[derive(Debug)]
pub struct SimulatedGateway {
    rng: StdRng,
    live: AHashSet<OrderId>,
}

impl SimulatedGateway {
    pub fn new(rng: StdRng) -> Self {
        Self { rng, live: AHashSet::new() }
    }

    pub fn live_orders(&self) -> usize {
        self.live.len()
    }
}

impl OrderGateway for SimulatedGateway {
    fn submit(&mut self, side: Side, price: Decimal, amount: Decimal) -> Result<OrderId, GatewayError> {
        if price <= Decimal::ZERO {
            return Err(GatewayError::Rejected { reason: format!("non-positive price {price}") });
        }
        if amount <= Decimal::ZERO {
            return Err(GatewayError::Rejected { reason: format!("non-positive amount {amount}") });
        }
        if self.live.len() as u64 > ORDER_ID_MAX - ORDER_ID_MIN {
            return Err(GatewayError::IdSpaceExhausted);
        }
        loop {
            let id = OrderId(self.rng.gen_range(ORDER_ID_MIN..=ORDER_ID_MAX));
            if self.live.insert(id) {
                trace!(%id, %side, %price, %amount, "simulated submit");
                return Ok(id);
            }
        }
    }

    fn cancel(&mut self, id: OrderId) -> CancelOutcome {
        if self.live.remove(&id) {
            CancelOutcome::Cancelled
        } else {
            CancelOutcome::NotFound
        }
    }

    fn acknowledge_fill(&mut self, id: OrderId) {
        self.live.remove(&id);
    }
}
