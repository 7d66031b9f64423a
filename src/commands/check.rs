//! Check command implementation.
//!
//! Validates the effective configuration and, on request, that the upstream
//! API answers for a given probe.

use atlas_probe_exporter::config::{validate_effective_config, Config};
use atlas_probe_exporter::probe::is_probe_id;
use atlas_probe_exporter::render::render_probe;
use atlas_probe_exporter::upstream::UpstreamClient;

/// Validates configuration and optionally upstream reachability.
///
/// Returns `Ok(false)` if any check failed.
pub async fn command_check(
    probe: Option<String>,
    config: &Config,
) -> Result<bool, Box<dyn std::error::Error>> {
    println!("🔍 Atlas Probe Exporter - System Check");
    println!("======================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
            if let Ok(addr) = config.listen_addr() {
                println!("   ✅ Listen address: {}", addr);
            }
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    if let Some(id) = probe {
        println!("\n🌐 Checking upstream API...");
        let upstream = config.upstream_config();
        println!("   ├─ Upstream: {}", upstream.base_url);
        println!("   ├─ Timeout: {}s", upstream.timeout.as_secs());

        if !is_probe_id(&id) {
            println!("   ❌ '{}' is not a valid probe id (expected digits only)", id);
            all_ok = false;
        } else {
            let client = UpstreamClient::new(&upstream)?;
            match client.fetch_probe(&id).await {
                Ok(outcome) => {
                    println!(
                        "   ✅ Probe {} fetched in {:.0}ms (status {})",
                        id,
                        outcome.elapsed.as_secs_f64() * 1000.0,
                        outcome.record.status_id
                    );
                    match render_probe(&id, &outcome.record) {
                        Ok(rendered) => {
                            println!("   ✅ Rendered {} series", rendered.series)
                        }
                        Err(e) => {
                            println!("   ❌ Rendering failed: {}", e);
                            all_ok = false;
                        }
                    }
                }
                Err(e) => {
                    println!("   ❌ {} ({})", e, e.kind());
                    all_ok = false;
                }
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - exporter is ready");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }
    Ok(all_ok)
}
