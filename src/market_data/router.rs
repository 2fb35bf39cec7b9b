// Router drives one source + engine through fixed-interval cycles
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::engine::gateway::OrderGateway;
use crate::engine::types::{EngineError, Fill, Inventory, OpenOrder};
use crate::market_data::adapters::{BookSource, FetchError, SourceError};
use crate::market_data::external_book::OrderBookSnapshot;
use crate::market_data::market_maker::MarketMakerEngine;
use crate::market_data::normaliser::{DataError, OrderBookNormaliser};
use crate::telemetry;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("bad order book: {0}")]
    Data(#[from] DataError),
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
}

impl CycleError {
    pub fn is_fatal(&self) -> bool {
        match self {
            CycleError::Fetch(e) => e.is_fatal(),
            CycleError::Data(_) => false,
            CycleError::Engine(_) => true,
        }
    }
}

impl From<SourceError> for CycleError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Fetch(e) => CycleError::Fetch(e),
            SourceError::Data(e) => CycleError::Data(e),
        }
    }
}

/// Everything that happened in one cycle, plus the state it left behind.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub snapshot: OrderBookSnapshot,
    pub fills: Vec<Fill>,
    pub cancelled: Vec<OpenOrder>,
    pub placed: Vec<OpenOrder>,
    pub inventory: Inventory,
    pub open_orders: Vec<OpenOrder>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "Cycle {} | best ask {} | best bid {} | fills {}",
            self.cycle,
            self.snapshot.best_ask,
            self.snapshot.best_bid,
            self.fills.len()
        )?;
        writeln!(f, "Base balance: {} | Quote balance: {}", self.inventory.base.normalize(), self.inventory.quote.normalize())?;
        writeln!(f)?;
        writeln!(f, "======= Open Orders =======")?;
        for o in &self.open_orders {
            writeln!(
                f,
                "{} price {} amount {} total {}",
                o.side,
                o.price.normalize(),
                o.amount.normalize(),
                o.notional().round_dp(8).normalize()
            )?;
        }
        Ok(())
    }
}

pub struct CycleRunner<S, G: OrderGateway> {
    source: S,
    normaliser: OrderBookNormaliser,
    engine: MarketMakerEngine<G>,
    cycle: u64,
}

impl<S: BookSource, G: OrderGateway> CycleRunner<S, G> {
    pub fn new(source: S, engine: MarketMakerEngine<G>) -> Self {
        Self { source, normaliser: OrderBookNormaliser::new(), engine, cycle: 0 }
    }

    pub fn engine(&self) -> &MarketMakerEngine<G> {
        &self.engine
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycle
    }

    /// fetch -> normalize -> settle -> cancel_all -> quote.
    /// Nothing is mutated until the snapshot is known to be quotable.
    #[instrument(level = "info", skip(self), fields(cycle = self.cycle + 1))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let records = self.source.fetch().await?;
        let snapshot = self.normaliser.normalize(&records)?;
        self.engine.check_quotable(&snapshot)?;

        let fills = self.engine.settle(&snapshot);
        let cancelled = self.engine.cancel_all();
        let placed = self.engine.quote(&snapshot)?;

        self.cycle += 1;
        let report = CycleReport {
            cycle: self.cycle,
            snapshot,
            fills,
            cancelled,
            placed,
            inventory: self.engine.inventory(),
            open_orders: self.engine.open_orders().snapshot(),
        };
        telemetry::record_cycle(&report);
        info!(
            fills = report.fills.len(),
            cancelled = report.cancelled.len(),
            placed = report.placed.len(),
            base = %report.inventory.base,
            quote = %report.inventory.quote,
            "cycle complete"
        );
        Ok(report)
    }
}

/// Run cycles on a fixed interval until `max_cycles` have been attempted
/// or a fatal error occurs. Recoverable errors skip the cycle.
pub async fn run_forever<S, G, F>(
    runner: &mut CycleRunner<S, G>,
    interval: Duration,
    max_cycles: Option<u64>,
    mut on_report: F,
) -> Result<(), CycleError>
where
    S: BookSource,
    G: OrderGateway,
    F: FnMut(&CycleReport),
{
    info!(source = %runner.source.describe(), interval_ms = interval.as_millis() as u64, ?max_cycles, "starting driver");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u64;
    while max_cycles.map_or(true, |max| attempts < max) {
        ticker.tick().await;
        attempts += 1;
        match runner.run_cycle().await {
            Ok(report) => on_report(&report),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal cycle error, stopping");
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "cycle skipped");
                telemetry::record_skipped();
            }
        }
    }
    Ok(())
}
