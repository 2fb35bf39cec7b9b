// Turn the raw `[orderId, price, amount]` feed into an `OrderBookSnapshot`.
// Individual orders don't matter to us, only the net amount resting at each price.

use ahash::AHashMap;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::engine::types::Side;
use crate::market_data::external_book::{OrderBookSnapshot, PriceLevel};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("order book is empty")]
    EmptyBook,
    #[error("order book is not a JSON array: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("order book record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("order book has no {missing} side")]
    OneSidedBook { missing: Side },
    #[error("arithmetic overflow computing {context}")]
    Overflow { context: &'static str },
    #[error("reference {side} price {price} is too small to quote against")]
    Unquotable { side: Side, price: Decimal },
}

/// One exchange order as published. Positive amount is ask liquidity, negative is bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOrderRecord {
    pub order_id: String,
    pub price: Decimal,
    pub signed_amount: Decimal,
}

impl RawOrderRecord {
    pub fn new(order_id: impl Into<String>, price: Decimal, signed_amount: Decimal) -> Self {
        Self { order_id: order_id.into(), price, signed_amount }
    }

    pub fn from_value(index: usize, value: &Value) -> Result<Self, DataError> {
        let fields = value
            .as_array()
            .ok_or_else(|| malformed(index, "expected an [orderId, price, amount] array"))?;
        if fields.len() < 3 {
            return Err(malformed(index, format!("expected 3 fields, got {}", fields.len())));
        }

        let order_id = match &fields[0] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let price = decimal_field(index, "price", &fields[1])?;
        if price <= Decimal::ZERO {
            return Err(malformed(index, format!("non-positive price {price}")));
        }
        let signed_amount = decimal_field(index, "amount", &fields[2])?;

        Ok(Self { order_id, price, signed_amount })
    }
}

fn malformed(index: usize, reason: impl Into<String>) -> DataError {
    DataError::MalformedRecord { index, reason: reason.into() }
}

fn decimal_field(index: usize, name: &str, value: &Value) -> Result<Decimal, DataError> {
    let Value::Number(n) = value else {
        return Err(malformed(index, format!("{name} is not a number: {value}")));
    };
    // serde_json prints the shortest round-trip form, which keeps e.g. 1800.1 exact
    let text = n.to_string();
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| malformed(index, format!("{name} {text} out of range: {e}")))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrderBookNormaliser;

impl OrderBookNormaliser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a response body into raw records.
    pub fn decode(&self, body: &[u8]) -> Result<Vec<RawOrderRecord>, DataError> {
        let values: Vec<Value> = serde_json::from_slice(body)?;
        self.decode_values(&values)
    }

    pub fn decode_values(&self, values: &[Value]) -> Result<Vec<RawOrderRecord>, DataError> {
        values.iter().enumerate().map(|(i, v)| RawOrderRecord::from_value(i, v)).collect()
    }

    /// Sum signed amounts per exact price. Output order is unspecified.
    pub fn aggregate(&self, records: &[RawOrderRecord]) -> Result<Vec<PriceLevel>, DataError> {
        let mut net: AHashMap<Decimal, Decimal> = AHashMap::with_capacity(records.len());
        for r in records {
            let level = net.entry(r.price).or_insert(Decimal::ZERO);
            *level = level
                .checked_add(r.signed_amount)
                .ok_or(DataError::Overflow { context: "net amount at a price level" })?;
        }
        Ok(net.into_iter().map(|(price, net_amount)| PriceLevel { price, net_amount }).collect())
    }

    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn normalize(&self, records: &[RawOrderRecord]) -> Result<OrderBookSnapshot, DataError> {
        if records.is_empty() {
            return Err(DataError::EmptyBook);
        }
        let levels = self.aggregate(records)?;
        let snapshot = OrderBookSnapshot::from_levels(levels)?;
        debug!(
            asks = snapshot.asks.len(),
            bids = snapshot.bids.len(),
            best_ask = %snapshot.best_ask,
            best_bid = %snapshot.best_bid,
            "normalized order book"
        );
        Ok(snapshot)
    }

    pub fn normalize_json(&self, body: &[u8]) -> Result<OrderBookSnapshot, DataError> {
        let records = self.decode(body)?;
        self.normalize(&records)
    }
}
