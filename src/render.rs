//! Per-scrape Prometheus registry for a single probe.
//!
//! Each scrape builds its own `Registry`, fills it from one `ProbeRecord`,
//! encodes it and drops it. Nothing is registered in the process-wide default
//! registry, so concurrent scrapes cannot observe each other's gauges.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::ExporterError;
use crate::probe::ProbeRecord;

/// Initial buffer capacity for encoding; a full probe renders to ~1 KB.
const BUFFER_CAP: usize = 2 * 1024;

pub const METRIC_STATUS: &str = "atlas_status";
pub const METRIC_STATUS_SINCE: &str = "atlas_status_since";
pub const METRIC_TOTAL_UPTIME: &str = "atlas_total_uptime";
pub const METRIC_FIRST_CONNECTED: &str = "atlas_first_connected";
pub const METRIC_LAST_CONNECTED: &str = "atlas_last_connected";
pub const METRIC_INFO: &str = "atlas_info";

/// Encoded exposition body plus its content type.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: String,
    pub content_type: String,
    pub series: usize,
}

/// Registry holding the gauges of one probe.
pub struct ProbeMetrics {
    id: String,
    registry: Registry,
}

impl ProbeMetrics {
    /// Creates a fresh registry and registers the six probe gauges.
    pub fn build(id: &str, record: &ProbeRecord) -> Result<Self, ExporterError> {
        let metrics = Self {
            id: id.to_string(),
            registry: Registry::new(),
        };

        metrics.gauge(
            METRIC_STATUS,
            "Atlas Probe Status ID",
            record.status_id as f64,
        )?;
        metrics.gauge(
            METRIC_STATUS_SINCE,
            "Atlas Probe Status Since",
            record.status_since,
        )?;
        metrics.gauge(
            METRIC_TOTAL_UPTIME,
            "Atlas Probe Total Uptime",
            record.total_uptime,
        )?;
        metrics.gauge(
            METRIC_FIRST_CONNECTED,
            "Atlas Probe First Connected",
            record.first_connected,
        )?;
        metrics.gauge(
            METRIC_LAST_CONNECTED,
            "Atlas Probe Last Connected",
            record.last_connected,
        )?;

        let info = GaugeVec::new(
            Opts::new(METRIC_INFO, "Atlas Probe Info"),
            &["address_v4", "address_v6"],
        )
        .map_err(|e| metrics.registration_error(METRIC_INFO, e))?;
        info.with_label_values(&[record.address_v4.as_str(), record.address_v6.as_str()])
            .set(1.0);
        metrics
            .registry
            .register(Box::new(info))
            .map_err(|e| metrics.registration_error(METRIC_INFO, e))?;

        Ok(metrics)
    }

    fn gauge(&self, name: &str, help: &str, value: f64) -> Result<(), ExporterError> {
        let gauge = Gauge::new(name, help).map_err(|e| self.registration_error(name, e))?;
        gauge.set(value);
        self.registry
            .register(Box::new(gauge))
            .map_err(|e| self.registration_error(name, e))
    }

    fn registration_error(&self, metric: &str, e: prometheus::Error) -> ExporterError {
        ExporterError::RegistrationFailure {
            id: self.id.clone(),
            metric: metric.to_string(),
            reason: e.to_string(),
        }
    }

    /// Encodes the registry in the text exposition format. The whole body is
    /// produced before anything is written to the client.
    pub fn encode(&self) -> Result<Rendered, ExporterError> {
        let families = self.registry.gather();
        let series = families.iter().map(|f| f.get_metric().len()).sum();

        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(BUFFER_CAP);
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| ExporterError::EncodingFailure {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;

        let body = String::from_utf8(buffer).map_err(|e| ExporterError::EncodingFailure {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Rendered {
            body,
            content_type: encoder.format_type().to_string(),
            series,
        })
    }
}

/// Builds, encodes and drops the registry for one probe.
pub fn render_probe(id: &str, record: &ProbeRecord) -> Result<Rendered, ExporterError> {
    ProbeMetrics::build(id, record)?.encode()
}
