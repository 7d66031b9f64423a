//! Application state shared by the HTTP handlers.
//!
//! Nothing in here holds probe data: probe gauges live in per-scrape
//! registries. The state only carries the upstream client, optional request
//! coalescing and the exporter's own bookkeeping.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::inflight::InflightFetches;
use crate::telemetry::ExporterTelemetry;
use crate::upstream::UpstreamClient;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub upstream: UpstreamClient,
    /// Present when `coalesce_requests` is enabled.
    pub inflight: Option<InflightFetches>,
    /// Present when `enable_telemetry` is enabled.
    pub telemetry: Option<ExporterTelemetry>,
    pub health_stats: HealthStats,
    pub start_time: Instant,
}

impl AppState {
    /// Builds the state from an effective configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(&config.upstream_config())?;

        let telemetry = if config.enable_telemetry.unwrap_or(true) {
            Some(ExporterTelemetry::new()?)
        } else {
            None
        };

        let inflight = config
            .coalesce_requests
            .unwrap_or(false)
            .then(InflightFetches::new);

        Ok(Self {
            upstream,
            inflight,
            telemetry,
            health_stats: HealthStats::new(),
            start_time: Instant::now(),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
