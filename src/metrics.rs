//! Metrics initialization for Prometheus exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::config::MetricsConfig;
use crate::error::{Error, Result};

/// Non-empty frames read from the tunnel.
pub const FRAMES_TOTAL: &str = "dumbify_frames_total";
/// DNS queries answered with a synthetic NXDOMAIN.
pub const QUERIES_BLOCKED_TOTAL: &str = "dumbify_queries_blocked_total";
/// UDP/53 frames whose question name could not be read.
pub const FRAMES_MALFORMED_TOTAL: &str = "dumbify_frames_malformed_total";

/// Initialize the metrics system based on configuration.
///
/// When enabled, this starts an HTTP listener exposing the pump counters for
/// Prometheus to scrape. When disabled the counters are recorded nowhere.
///
/// # Errors
///
/// Fails when the exporter cannot be installed, for instance because the
/// listen address is taken or a recorder is already set.
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(|err| Error::Metrics(err.to_string()))?;

    info!(listen = %config.listen, "metrics exporter listening");
    Ok(())
}
