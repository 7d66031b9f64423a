//! Exporter self-telemetry served on `/metrics`.
//!
//! This registry lives for the whole process and only describes the exporter
//! itself. Probe gauges never go here; they are built per scrape in
//! [`crate::render`].

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::ExporterError;

/// Prometheus metrics describing the exporter's own behaviour.
#[derive(Clone)]
pub struct ExporterTelemetry {
    registry: Registry,
    /// Probe scrapes by result (`success`, `error`, `not_found`).
    pub scrapes_total: IntCounterVec,
    /// Failed scrapes by error kind.
    pub errors_total: IntCounterVec,
    pub upstream_duration_seconds: Histogram,
    pub inflight_fetches: IntGauge,
}

impl ExporterTelemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scrapes_total = IntCounterVec::new(
            Opts::new(
                "atlas_exporter_scrapes_total",
                "Probe scrapes served, by result",
            ),
            &["result"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new(
                "atlas_exporter_errors_total",
                "Failed probe scrapes, by error kind",
            ),
            &["kind"],
        )?;
        let upstream_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "atlas_exporter_upstream_duration_seconds",
                "Time spent fetching and decoding probe data from the upstream API",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let inflight_fetches = IntGauge::new(
            "atlas_exporter_inflight_fetches",
            "Probes with a coalesced upstream fetch currently in progress",
        )?;

        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(upstream_duration_seconds.clone()))?;
        registry.register(Box::new(inflight_fetches.clone()))?;

        Ok(Self {
            registry,
            scrapes_total,
            errors_total,
            upstream_duration_seconds,
            inflight_fetches,
        })
    }

    pub fn record_success(&self, upstream_seconds: f64) {
        self.scrapes_total.with_label_values(&["success"]).inc();
        self.upstream_duration_seconds.observe(upstream_seconds);
    }

    pub fn record_error(&self, err: &ExporterError) {
        self.scrapes_total.with_label_values(&["error"]).inc();
        self.errors_total.with_label_values(&[err.kind()]).inc();
    }

    pub fn record_not_found(&self) {
        self.scrapes_total.with_label_values(&["not_found"]).inc();
    }

    /// Encodes the exporter registry, returning body and content type.
    pub fn encode(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        let body = String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("invalid UTF-8 in metrics: {e}")))?;
        Ok((body, encoder.format_type().to_string()))
    }
}
