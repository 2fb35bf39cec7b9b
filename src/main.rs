use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use lobx_mm::config::Settings;
use lobx_mm::engine::gateway::SimulatedGateway;
use lobx_mm::market_data::adapters::http::HttpBookSource;
use lobx_mm::market_data::market_maker::MarketMakerEngine;
use lobx_mm::market_data::router::{run_forever, CycleRunner};
use lobx_mm::telemetry;

/// Simulated market maker quoting a ladder around a live exchange book.
#[derive(Debug, Parser)]
#[command(name = "lobx-mm", version, about)]
struct Cli {
    /// TOML settings file (defaults to config/default.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long, conflicts_with = "cycles")]
    once: bool,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Order book endpoint
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    interval_secs: Option<u64>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// tracing filter, RUST_LOG still wins
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(endpoint) = &self.endpoint {
            settings.market.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.interval_secs {
            settings.driver.interval_secs = secs;
        }
        if let Some(seed) = self.seed {
            settings.driver.seed = Some(seed);
        }
        if let Some(filter) = &self.log_filter {
            settings.telemetry.log_filter = filter.clone();
        }
    }

    fn max_cycles(&self) -> Option<u64> {
        if self.once {
            Some(1)
        } else {
            self.cycles
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    cli.apply(&mut settings);
    settings.validate()?;

    telemetry::init_tracing(&settings.telemetry.log_filter)?;
    telemetry::init_metrics(settings.telemetry.metrics_port)?;

    info!(
        symbol = %settings.market.symbol,
        endpoint = %settings.market.endpoint,
        base = %settings.inventory.base,
        quote = %settings.inventory.quote,
        seed = ?settings.driver.seed,
        "starting market maker"
    );

    let source = HttpBookSource::new(&settings.market.endpoint, &settings.market.symbol, settings.request_timeout())
        .context("building http client")?;

    // separate streams so order ids don't shift the quoting draws
    let (engine_rng, gateway_rng) = match settings.driver.seed {
        Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
        None => (StdRng::from_entropy(), StdRng::from_entropy()),
    };
    let engine = MarketMakerEngine::new(
        settings.initial_inventory(),
        settings.quoting_params(),
        SimulatedGateway::new(gateway_rng),
        engine_rng,
    )?;
    let mut runner = CycleRunner::new(source, engine);

    tokio::select! {
        res = run_forever(&mut runner, settings.interval(), cli.max_cycles(), |report| println!("{report}")) => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
        }
    }

    let inv = runner.engine().inventory();
    info!(
        cycles = runner.cycles_completed(),
        base = %inv.base,
        quote = %inv.quote,
        open_orders = runner.engine().open_orders().len(),
        "market maker stopped"
    );
    Ok(())
}
