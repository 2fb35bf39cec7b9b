//! Runtime settings.
//!
//! Layered with the `config` crate: struct defaults, then an optional TOML
//! file, then `LOBX_MM__SECTION__KEY` environment variables. The binary applies
//! CLI flags on top before calling [`Settings::validate`].

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::{AskFillRule, EngineError, Inventory};
use crate::market_data::market_maker::{default_bands, FractionRange, OffsetBand, QuotingParams};

pub const DEFAULT_CONFIG_FILE: &str = "config/default";
pub const ENV_PREFIX: &str = "LOBX_MM";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error(transparent)]
    Params(#[from] EngineError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub market: MarketSettings,
    pub inventory: InventorySettings,
    pub risk: RiskSettings,
    pub ladder: LadderSettings,
    pub fill: FillSettings,
    pub driver: DriverSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub symbol: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            symbol: "tETHUSD".to_string(),
            endpoint: "https://api.rhino.fi/bfx/v2/book/tETHUSD/R0".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Starting balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub base: Decimal,
    pub quote: Decimal,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self { base: Decimal::new(10, 0), quote: Decimal::new(20_000, 0) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub min_fraction: f64,
    pub max_fraction: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        let r = FractionRange::default();
        Self { min_fraction: r.min, max_fraction: r.max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderSettings {
    pub bands: Vec<OffsetBand>,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self { bands: default_bands() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSettings {
    pub ask_rule: AskFillRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub interval_secs: u64,
    pub seed: Option<u64>, // fixed seed makes runs reproducible
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self { interval_secs: 5, seed: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub log_filter: String,
    pub metrics_port: u16,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { log_filter: "info".to_string(), metrics_port: 9000 }
    }
}

impl Settings {
    /// Load from `path`, or from `config/default.toml` when present.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let cfg = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.market.endpoint.trim().is_empty() {
            return Err(SettingsError::Invalid("market.endpoint is empty".into()));
        }
        if self.market.request_timeout_secs == 0 {
            return Err(SettingsError::Invalid("market.request_timeout_secs must be > 0".into()));
        }
        if self.driver.interval_secs == 0 {
            return Err(SettingsError::Invalid("driver.interval_secs must be > 0".into()));
        }
        if self.inventory.base < Decimal::ZERO || self.inventory.quote < Decimal::ZERO {
            return Err(SettingsError::Invalid("inventory balances must not be negative".into()));
        }
        self.quoting_params().validate()?;
        Ok(())
    }

    pub fn quoting_params(&self) -> QuotingParams {
        QuotingParams {
            risk: FractionRange { min: self.risk.min_fraction, max: self.risk.max_fraction },
            bands: self.ladder.bands.clone(),
            ask_fill_rule: self.fill.ask_rule,
        }
    }

    pub fn initial_inventory(&self) -> Inventory {
        Inventory::new(self.inventory.base, self.inventory.quote)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.market.request_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.driver.interval_secs)
    }
}
