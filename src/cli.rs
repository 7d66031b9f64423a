//! CLI arguments and subcommands for atlas-probe-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output formats for the `fetch` subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchFormat {
    /// Prometheus exposition text, exactly as served on /metrics/{id}
    Prometheus,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "atlas-probe-exporter",
    about = "Prometheus exporter for RIPE Atlas probe status",
    long_about = "Prometheus exporter for RIPE Atlas probe status.\n\n\
                  Every scrape of /metrics/{id} fetches the probe from the RIPE Atlas \
                  REST API and exposes its status, uptime and connection times as gauges. \
                  Nothing is cached between scrapes.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Listen address (host:port)
    #[arg(short = 'l', long, env = "LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Log level [default: info]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Base URL of the RIPE Atlas API
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Timeout for one upstream request in seconds
    #[arg(long)]
    pub upstream_timeout: Option<u64>,

    /// Let concurrent scrapes of the same probe share one upstream request
    #[arg(long)]
    pub coalesce_requests: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable exporter self-metrics on /metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and optionally upstream reachability
    Check {
        /// Also fetch this probe to verify the upstream API is reachable
        #[arg(long)]
        probe: Option<String>,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Scrape one probe and print the result
    Fetch {
        /// Probe identifier
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value = "prometheus")]
        format: FetchFormat,
    },
}
