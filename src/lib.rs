//! Atlas Probe Exporter Library
//!
//! A Prometheus exporter for RIPE Atlas probes. Every scrape of
//! `/metrics/{id}` fetches the probe from the RIPE Atlas REST API, decodes it
//! into a [`ProbeRecord`](probe::ProbeRecord) and renders a request-local
//! registry of gauges:
//!
//! - `atlas_status`, `atlas_status_since`, `atlas_total_uptime`
//! - `atlas_first_connected`, `atlas_last_connected` (0 when unknown upstream)
//! - `atlas_info{address_v4, address_v6}` (always 1)
//!
//! # Usage
//!
//! ```rust,no_run
//! use atlas_probe_exporter::{config::Config, handlers, state::AppState};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let state = AppState::from_config(&config)?.shared();
//! let app = handlers::router(state, &config);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:9207").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health_stats;
pub mod inflight;
pub mod probe;
pub mod render;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export main types for convenience
pub use error::ExporterError;
pub use probe::ProbeRecord;
pub use render::{render_probe, ProbeMetrics};
pub use upstream::{UpstreamClient, UpstreamConfig};
