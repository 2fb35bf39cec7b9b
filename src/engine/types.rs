use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }

    // Asset locked up while an order on this side rests
    pub fn reserved_asset(&self) -> Asset {
        match self {
            Side::Bid => Asset::Quote,
            Side::Ask => Asset::Base,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Base,
    Quote,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Base => f.write_str("base"),
            Asset::Quote => f.write_str("quote"),
        }
    }
}

// Synthetic resting order. Either fully open or gone, never partially filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub reserved_value: Decimal,
}

impl OpenOrder {
    pub fn reserved_asset(&self) -> Asset {
        self.side.reserved_asset()
    }

    /// Value of the order in quote currency.
    pub fn notional(&self) -> Decimal {
        self.amount * self.price
    }
}

/// The two running balances. Reserved funds of open orders are not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub base: Decimal,
    pub quote: Decimal,
}

impl Inventory {
    pub fn new(base: Decimal, quote: Decimal) -> Self {
        Self { base, quote }
    }

    pub fn balance(&self, asset: Asset) -> Decimal {
        match asset {
            Asset::Base => self.base,
            Asset::Quote => self.quote,
        }
    }

    pub fn credit(&mut self, asset: Asset, value: Decimal) {
        match asset {
            Asset::Base => self.base += value,
            Asset::Quote => self.quote += value,
        }
    }

    /// Debits `value`, refusing (and leaving the balance untouched) if it would go negative.
    pub fn debit(&mut self, asset: Asset, value: Decimal) -> Result<(), EngineError> {
        let available = self.balance(asset);
        if value > available {
            return Err(EngineError::InsufficientBalance { asset, needed: value, available });
        }
        match asset {
            Asset::Base => self.base -= value,
            Asset::Quote => self.quote -= value,
        }
        Ok(())
    }
}

// Settlement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub order: OpenOrder,
    pub credited: Asset,
    pub value: Decimal,
}

/// Reference price an ask is compared against when deciding it traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskFillRule {
    /// Filled once the ask sits above the book's best bid.
    #[default]
    BestBid,
    /// Filled once the ask sits above the book's best ask.
    BestAsk,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient {asset} balance: needed {needed}, available {available}")]
    InsufficientBalance { asset: Asset, needed: Decimal, available: Decimal },
    #[error("reference {side} price {price} is not positive")]
    InvalidReference { side: Side, price: Decimal },
    #[error("random draw {draw} cannot be represented as a decimal")]
    Sampling { draw: f64 },
    #[error("arithmetic overflow computing {context}")]
    Overflow { context: &'static str },
    #[error("invalid quoting parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
