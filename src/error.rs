//! Error types for the scrape pipeline.
//!
//! Every failure that can happen while serving `/metrics/{id}` is represented
//! here. Causes are stored as strings so a single error can be handed to every
//! request waiting on a coalesced fetch.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Generic body returned to scrapers on any internal failure.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error\n";

/// Failures of a single scrape. None of them are fatal to the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExporterError {
    #[error("upstream unavailable for probe {id}: {reason}")]
    UpstreamUnavailable { id: String, reason: String },

    #[error("upstream request for probe {id} timed out after {timeout_secs}s")]
    UpstreamTimeout { id: String, timeout_secs: u64 },

    #[error("failed to read upstream body for probe {id}: {reason}")]
    UpstreamBodyUnreadable { id: String, reason: String },

    #[error("failed to decode upstream body for probe {id}: {reason} (body: {snippet:?})")]
    DecodeFailure {
        id: String,
        reason: String,
        snippet: String,
    },

    #[error("failed to register metric {metric} for probe {id}: {reason}")]
    RegistrationFailure {
        id: String,
        metric: String,
        reason: String,
    },

    #[error("failed to encode metrics for probe {id}: {reason}")]
    EncodingFailure { id: String, reason: String },
}

impl ExporterError {
    /// Stable label used in logs and exporter telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            ExporterError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ExporterError::UpstreamTimeout { .. } => "upstream_timeout",
            ExporterError::UpstreamBodyUnreadable { .. } => "upstream_body_unreadable",
            ExporterError::DecodeFailure { .. } => "decode_failure",
            ExporterError::RegistrationFailure { .. } => "registration_failure",
            ExporterError::EncodingFailure { .. } => "encoding_failure",
        }
    }

    /// Probe identifier the failed scrape was for.
    pub fn probe_id(&self) -> &str {
        match self {
            ExporterError::UpstreamUnavailable { id, .. }
            | ExporterError::UpstreamTimeout { id, .. }
            | ExporterError::UpstreamBodyUnreadable { id, .. }
            | ExporterError::DecodeFailure { id, .. }
            | ExporterError::RegistrationFailure { id, .. }
            | ExporterError::EncodingFailure { id, .. } => id,
        }
    }

    /// True for failures talking to the upstream API, as opposed to local
    /// rendering problems.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ExporterError::UpstreamUnavailable { .. }
                | ExporterError::UpstreamTimeout { .. }
                | ExporterError::UpstreamBodyUnreadable { .. }
                | ExporterError::DecodeFailure { .. }
        )
    }
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            INTERNAL_ERROR_BODY,
        )
            .into_response()
    }
}
