//! Probe metrics endpoint handler.
//!
//! `/metrics/{id}` runs the whole scrape pipeline for one probe: validate the
//! identifier, fetch and decode the upstream record, build a request-local
//! registry and encode it. Any failure ends in a 500 without a partial body.

use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, instrument, warn};

use crate::error::ExporterError;
use crate::probe::is_probe_id;
use crate::render::{render_probe, Rendered};
use crate::state::{AppState, SharedState};

/// Handler for the `/metrics/{id}` endpoint.
#[instrument(skip(state))]
pub async fn probe_metrics_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let start = Instant::now();
    state.health_stats.record_http_request();

    if !is_probe_id(&id) {
        debug!("Rejecting malformed probe id {:?}", id);
        state.health_stats.record_not_found();
        if let Some(telemetry) = &state.telemetry {
            telemetry.record_not_found();
        }
        return StatusCode::NOT_FOUND.into_response();
    }

    match scrape(&state, &id).await {
        Ok((rendered, upstream_elapsed)) => {
            let request_ms = start.elapsed().as_secs_f64() * 1000.0;
            state.health_stats.record_success(
                upstream_elapsed.as_secs_f64() * 1000.0,
                request_ms,
                rendered.body.len(),
                rendered.series,
            );
            if let Some(telemetry) = &state.telemetry {
                telemetry.record_success(upstream_elapsed.as_secs_f64());
            }
            debug!(
                "Probe {} scraped: {} series, {} bytes, {:.3}ms",
                id,
                rendered.series,
                rendered.body.len(),
                request_ms
            );

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, rendered.content_type)],
                rendered.body,
            )
                .into_response()
        }
        Err(e) => {
            log_scrape_error(&e);
            state
                .health_stats
                .record_failure(&e, start.elapsed().as_secs_f64() * 1000.0);
            if let Some(telemetry) = &state.telemetry {
                telemetry.record_error(&e);
            }
            e.into_response()
        }
    }
}

/// Fetches probe `id` and renders its metrics.
///
/// With coalescing enabled, concurrent scrapes of the same probe share one
/// upstream fetch. Rendering always happens per request.
pub async fn scrape(state: &AppState, id: &str) -> Result<(Rendered, Duration), ExporterError> {
    let outcome = match &state.inflight {
        Some(inflight) => {
            let outcome = inflight
                .run(id, || state.upstream.fetch_probe(id))
                .await;
            if let Some(telemetry) = &state.telemetry {
                telemetry.inflight_fetches.set(inflight.len() as i64);
            }
            outcome
        }
        None => state.upstream.fetch_probe(id).await,
    }?;

    let rendered = render_probe(id, &outcome.record)?;
    Ok((rendered, outcome.elapsed))
}

/// Upstream failures are expected from time to time; local rendering
/// failures are not.
fn log_scrape_error(e: &ExporterError) {
    if e.is_upstream() {
        warn!(
            probe_id = e.probe_id(),
            kind = e.kind(),
            "Scrape failed: {}",
            e
        );
    } else {
        error!(
            probe_id = e.probe_id(),
            kind = e.kind(),
            "Metrics rendering failed, this is a bug: {}",
            e
        );
    }
}
