//! Fetch command implementation.
//!
//! Runs the scrape pipeline for one probe from the command line.

use anyhow::{bail, Context};
use chrono::DateTime;

use atlas_probe_exporter::cli::FetchFormat;
use atlas_probe_exporter::config::Config;
use atlas_probe_exporter::probe::{is_probe_id, ProbeRecord};
use atlas_probe_exporter::render::render_probe;
use atlas_probe_exporter::upstream::UpstreamClient;

/// Fetches one probe and prints it in the requested format.
pub async fn command_fetch(id: &str, format: FetchFormat, config: &Config) -> anyhow::Result<()> {
    if !is_probe_id(id) {
        bail!("'{}' is not a valid probe id (expected digits only)", id);
    }

    let client = UpstreamClient::new(&config.upstream_config())
        .context("failed to build upstream HTTP client")?;
    let outcome = client
        .fetch_probe(id)
        .await
        .with_context(|| format!("failed to fetch probe {} from {}", id, client.base_url()))?;

    match format {
        FetchFormat::Prometheus => {
            let rendered = render_probe(id, &outcome.record)?;
            print!("{}", rendered.body);
        }
        FetchFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
        }
        FetchFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&outcome.record)?);
            print_timestamps(&outcome.record);
        }
    }

    Ok(())
}

/// Appends human-readable versions of the epoch fields as YAML comments.
fn print_timestamps(record: &ProbeRecord) {
    for (name, value) in [
        ("status_since", record.status_since),
        ("first_connected", record.first_connected),
        ("last_connected", record.last_connected),
    ] {
        // 0 means the API did not report the field
        if value <= 0.0 {
            continue;
        }
        if let Some(ts) = DateTime::from_timestamp(value as i64, 0) {
            println!("# {}: {}", name, ts.to_rfc3339());
        }
    }
}
