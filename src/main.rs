//! atlas-probe-exporter
//!
//! Prometheus exporter for RIPE Atlas probes with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod commands;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, level_filters::LevelFilter};

use atlas_probe_exporter::cli::{Args, Commands, LogLevel};
use atlas_probe_exporter::config::{
    resolve_config, show_config, validate_effective_config, Config,
};
use atlas_probe_exporter::handlers;
use atlas_probe_exporter::state::AppState;
use commands::{command_check, command_config, command_fetch};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), *format, *commented),

            Commands::Check { probe } => {
                let config = resolve_config(&args)?;
                if !command_check(probe.clone(), &config).await? {
                    std::process::exit(1);
                }
                Ok(())
            }

            Commands::Fetch { id, format } => {
                let config = load_validated_config(&args)?;
                setup_logging(args.log_level.unwrap_or(LogLevel::Warn));
                if let Err(e) = command_fetch(id, *format, &config).await {
                    eprintln!("❌ {:#}", e);
                    std::process::exit(1);
                }
                Ok(())
            }
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(config.log_level());

    info!("Starting atlas-probe-exporter {}", env!("CARGO_PKG_VERSION"));

    let addr = config.listen_addr()?;
    let upstream = config.upstream_config();
    info!(
        "Upstream: {} (timeout {}s, coalescing {})",
        upstream.base_url,
        upstream.timeout.as_secs(),
        if config.coalesce_requests.unwrap_or(false) {
            "enabled"
        } else {
            "disabled"
        }
    );

    let state = AppState::from_config(&config)
        .map_err(|e| {
            error!("Failed to initialize exporter state: {:#}", e);
            e
        })?
        .shared();

    let app = handlers::router(state, &config);

    if config.enable_tls.unwrap_or(false) {
        // These paths are guaranteed to exist since validate_effective_config() was called earlier
        let (Some(cert_path), Some(key_path)) = (&config.tls_cert_path, &config.tls_key_path)
        else {
            return Err("TLS enabled without certificate and key paths".into());
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(None);
        });

        info!("atlas-probe-exporter listening on https://{}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| {
                error!("Server error on {}: {}", addr, e);
                e
            })?;
    } else {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind {}: {}", addr, e);
            e
        })?;
        info!("atlas-probe-exporter listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("Server error: {}", e);
                e
            })?;
    }

    info!("atlas-probe-exporter stopped gracefully");
    Ok(())
}
