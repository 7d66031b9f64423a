//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! exporter health statistics as a plain-text report.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Data source: RIPE Atlas probe API (https://atlas.ripe.net/docs/apis/rest-api-reference/)";

/// Handler for the /health endpoint.
///
/// The exporter itself is healthy as long as it can answer; upstream failures
/// are reported in the body but do not change the status code.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");
    state.health_stats.record_http_request();

    let uptime_hours = state.health_stats.get_uptime_seconds() as f64 / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let coalescing = match &state.inflight {
        Some(inflight) => format!("enabled ({} in flight)", inflight.len()),
        None => "disabled".to_string(),
    };

    let table = state.health_stats.render_table();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "OK\n\nUptime: {uptime_str}\nUpstream: {}\nRequest coalescing: {coalescing}\n\n{table}\n{FOOTER_TEXT}\n",
            state.upstream.base_url()
        ),
    )
}
