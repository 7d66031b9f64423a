//! Exporter self-telemetry endpoint handler.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, instrument};

use crate::error::INTERNAL_ERROR_BODY;
use crate::state::SharedState;

/// Handler for the `/metrics` endpoint.
#[instrument(skip(state))]
pub async fn exporter_metrics_handler(State(state): State<SharedState>) -> Response {
    state.health_stats.record_http_request();

    let Some(telemetry) = &state.telemetry else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(inflight) = &state.inflight {
        telemetry.inflight_fetches.set(inflight.len() as i64);
    }

    match telemetry.encode() {
        Ok((body, content_type)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!("Failed to encode exporter metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}
