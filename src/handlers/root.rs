//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");
    let uptime_secs = state.start_time.elapsed().as_secs();
    let uptime_str = format!(
        "{}h {}m {}s",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );
    let upstream = state.upstream.base_url();

    let mut endpoints = vec![(
        "/metrics/{id}",
        "Gauges for one RIPE Atlas probe, fetched live from the upstream API",
    )];
    if state.telemetry.is_some() {
        endpoints.push(("/metrics", "Exporter self-telemetry"));
    }
    endpoints.push(("/health", "Exporter health report (if enabled)"));

    let rows: String = endpoints
        .iter()
        .map(|(path, desc)| format!("            <li><code>{path}</code> - {desc}</li>\n"))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Atlas Probe Exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; line-height: 1.6; }}
        code {{ background: #f1f3f5; padding: 2px 6px; border-radius: 3px; }}
        .footer {{ color: #888; font-size: 0.9em; margin-top: 30px; }}
    </style>
</head>
<body>
    <h1>Atlas Probe Exporter</h1>
    <p>Version {version} &middot; Uptime {uptime_str} &middot; Upstream <code>{upstream}</code></p>
    <h2>Endpoints</h2>
    <ul>
{rows}    </ul>
    <p>Example scrape config: <code>metrics_path: /metrics/6001</code></p>
    <div class="footer">{FOOTER_TEXT}</div>
</body>
</html>
"#
    ))
}
