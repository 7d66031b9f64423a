//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use atlas_probe_exporter::cli::ConfigFormat;
use atlas_probe_exporter::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("atlas-probe-exporter.yaml"));

    let mut content = render_config(&config, format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Atlas Probe Exporter Configuration
# ===================================
#
# Server Configuration
# --------------------
# listen_addr: "0.0.0.0:9207"      # host:port, overridden by LISTEN_ADDR and --listen-addr
#
# Upstream API
# ------------
# upstream_url: "https://atlas.ripe.net"  # Probes are read from {upstream_url}/api/v2/probes/{id}/
# upstream_timeout_secs: 10        # Per-request timeout (1-300)
# user_agent: "atlas-probe-exporter/<version>"
# coalesce_requests: false         # Share one upstream request between concurrent scrapes of a probe
#
# Feature Flags
# -------------
# enable_health: true              # Enable /health endpoint
# enable_telemetry: true           # Enable exporter self-metrics on /metrics
#
# Logging
# -------
# log_level: "info"                # off, error, warn, info, debug, trace
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false                # Enable HTTPS (default: false)
# tls_cert_path: null              # Path to TLS certificate (PEM format)
# tls_key_path: null               # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
