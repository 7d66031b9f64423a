//! HTTP endpoint handlers for the exporter.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics/{id}`: Prometheus metrics for one probe
//! - `/metrics`: Exporter self-telemetry
//! - `/health`: Health check endpoint
//! - `/`: Landing page

pub mod exporter;
pub mod health;
pub mod probe;
pub mod root;

use axum::{routing::get, Router};

use crate::config::Config;
use crate::state::SharedState;

// Re-export handlers
pub use exporter::exporter_metrics_handler;
pub use health::health_handler;
pub use probe::{probe_metrics_handler, scrape};
pub use root::root_handler;

/// Builds the HTTP router. Paths that match no route get axum's default 404.
pub fn router(state: SharedState, config: &Config) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics/{id}", get(probe_metrics_handler));

    if state.telemetry.is_some() {
        app = app.route("/metrics", get(exporter_metrics_handler));
    }

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app.with_state(state)
}
