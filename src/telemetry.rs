use rust_decimal::prelude::ToPrimitive;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::market_data::router::CycleReport;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter; a malformed filter is an error rather than silently
/// dropping to defaults.
pub fn init_tracing(configured: &str) -> anyhow::Result<()> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), configured)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing already initialised: {e}"))
}

fn log_filter(from_env: Option<String>, configured: &str) -> Result<EnvFilter, ParseError> {
    match from_env.filter(|d| !d.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_new(configured),
    }
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    tracing::info!(port, "prometheus exporter listening on /metrics");
    metrics::gauge!("mm_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_port: u16) -> anyhow::Result<()> {
    Ok(())
}

// Without an installed recorder these are no-ops.
pub fn record_cycle(report: &CycleReport) {
    metrics::gauge!("mm_base_balance").set(report.inventory.base.to_f64().unwrap_or(0.0));
    metrics::gauge!("mm_quote_balance").set(report.inventory.quote.to_f64().unwrap_or(0.0));
    metrics::gauge!("mm_open_orders").set(report.open_orders.len() as f64);
    metrics::counter!("mm_fills_total").increment(report.fills.len() as u64);
    metrics::counter!("mm_cycles_total").increment(1);
}

pub fn record_skipped() {
    metrics::counter!("mm_cycle_skipped_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_directives_win() {
        assert!(log_filter(Some("warn".into()), "lobx_mm=nonsense").is_ok());
        assert!(log_filter(Some("  ".into()), "info,lobx_mm=debug").is_ok());
    }

    #[test]
    fn test_bad_configured_filter_rejected() {
        assert!(log_filter(None, "info,lobx_mm=debug").is_ok());
        assert!(log_filter(None, "lobx_mm=nonsense").is_err());
    }
}
