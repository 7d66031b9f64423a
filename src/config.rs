//! Configuration management for atlas-probe-exporter.
//!
//! This module handles loading, merging, and validating configuration from files,
//! the environment and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use crate::upstream::{
    default_user_agent, UpstreamConfig, DEFAULT_UPSTREAM_TIMEOUT_SECS, DEFAULT_UPSTREAM_URL,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9207";
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 300;

/// Default config file locations, first existing one wins.
const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/atlas-probe-exporter/config.yaml",
    "/etc/atlas-probe-exporter/config.yml",
    "/etc/atlas-probe-exporter/config.json",
    "./atlas-probe-exporter.yaml",
    "./atlas-probe-exporter.yml",
    "./atlas-probe-exporter.json",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    #[serde(alias = "listen-addr")]
    pub listen_addr: Option<String>,

    // Upstream API
    #[serde(alias = "upstream-url")]
    pub upstream_url: Option<String>,
    #[serde(alias = "upstream-timeout-secs")]
    pub upstream_timeout_secs: Option<u64>,
    #[serde(alias = "user-agent")]
    pub user_agent: Option<String>,
    #[serde(alias = "coalesce-requests")]
    pub coalesce_requests: Option<bool>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: Some(DEFAULT_LISTEN_ADDR.to_string()),
            upstream_url: Some(DEFAULT_UPSTREAM_URL.to_string()),
            upstream_timeout_secs: Some(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            user_agent: Some(default_user_agent()),
            coalesce_requests: Some(false),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Effective listen address. Host names are resolved and the first
    /// address wins; an empty value means the default.
    pub fn listen_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let raw = self
            .listen_addr
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LISTEN_ADDR);
        raw.to_socket_addrs()
            .map_err(|e| format!("Invalid listen_addr '{}': {}", raw, e))?
            .next()
            .ok_or_else(|| format!("Invalid listen_addr '{}': no address found", raw).into())
    }

    /// Effective log level; unknown strings fall back to `info`.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
            .unwrap_or(LogLevel::Info)
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self
                .upstream_url
                .clone()
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            timeout: Duration::from_secs(
                self.upstream_timeout_secs
                    .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            ),
            user_agent: self.user_agent.clone().unwrap_or_else(default_user_agent),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.listen_addr()?;

    if let Some(url) = cfg.upstream_url.as_deref() {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| format!("upstream_url '{}' must start with http:// or https://", url))?;
        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(format!("upstream_url '{}' has no host", url).into());
        }
    }

    if let Some(timeout) = cfg.upstream_timeout_secs {
        if timeout == 0 || timeout > MAX_UPSTREAM_TIMEOUT_SECS {
            return Err(format!(
                "upstream_timeout_secs must be between 1 and {}, got {}",
                MAX_UPSTREAM_TIMEOUT_SECS, timeout
            )
            .into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!(
                "Invalid log_level '{}', expected one of off, error, warn, info, debug, trace",
                level
            )
            .into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves configuration from CLI args, environment, config file, and defaults.
/// This enforces precedence: CLI > LISTEN_ADDR env > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // clap folds LISTEN_ADDR into this field when the flag is absent; an
    // empty value counts as unset
    if let Some(addr) = args.listen_addr.as_deref().filter(|s| !s.is_empty()) {
        config.listen_addr = Some(addr.to_string());
    }
    if let Some(level) = args.log_level {
        config.log_level = level
            .to_possible_value()
            .map(|v| v.get_name().to_string());
    }
    if let Some(url) = &args.upstream_url {
        config.upstream_url = Some(url.clone());
    }
    if let Some(timeout) = args.upstream_timeout {
        config.upstream_timeout_secs = Some(timeout);
    }

    // Feature flags
    if args.coalesce_requests {
        config.coalesce_requests = Some(true);
    }
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads a config file, falling back to the default locations and then to
/// built-in defaults. Keys missing from the file keep their default value.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)?;

    let file_config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_with_defaults(file_config))
}

fn merge_with_defaults(file: Config) -> Config {
    let defaults = Config::default();
    Config {
        listen_addr: file.listen_addr.or(defaults.listen_addr),
        upstream_url: file.upstream_url.or(defaults.upstream_url),
        upstream_timeout_secs: file
            .upstream_timeout_secs
            .or(defaults.upstream_timeout_secs),
        user_agent: file.user_agent.or(defaults.user_agent),
        coalesce_requests: file.coalesce_requests.or(defaults.coalesce_requests),
        enable_health: file.enable_health.or(defaults.enable_health),
        enable_telemetry: file.enable_telemetry.or(defaults.enable_telemetry),
        log_level: file.log_level.or(defaults.log_level),
        enable_tls: file.enable_tls.or(defaults.enable_tls),
        tls_cert_path: file.tls_cert_path,
        tls_key_path: file.tls_key_path,
    }
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
