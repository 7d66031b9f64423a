//! Probe record decoded from the RIPE Atlas probe API.
//!
//! This is the single translation point between the upstream JSON schema and
//! the values the exporter renders. Schema drift upstream is fixed here.

use serde::{Deserialize, Serialize};

use crate::error::ExporterError;

/// Maximum number of body bytes quoted in decode failure diagnostics.
pub const BODY_SNIPPET_LIMIT: usize = 256;

/// Returns true if `id` matches `^[0-9]+$`.
pub fn is_probe_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Nested `status` object of a probe. The API sends `id` as a JSON number,
/// which may arrive as `1` or `1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStatus {
    #[serde(default)]
    pub id: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Probe fields as they arrive on the wire. Everything is optional; only a
/// missing status id is a decode failure.
#[derive(Debug, Deserialize)]
struct WireProbe {
    #[serde(default)]
    status: Option<ProbeStatus>,
    #[serde(default)]
    status_since: Option<f64>,
    #[serde(default)]
    total_uptime: Option<f64>,
    #[serde(default)]
    first_connected: Option<f64>,
    #[serde(default)]
    last_connected: Option<f64>,
    #[serde(default)]
    address_v4: Option<String>,
    #[serde(default)]
    address_v6: Option<String>,
}

/// Decoded probe status. Immutable once built and owned by one scrape.
///
/// Numeric fields missing or `null` upstream are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRecord {
    pub status_id: i64,
    pub status_name: Option<String>,
    pub status_since: f64,
    pub total_uptime: f64,
    pub first_connected: f64,
    pub last_connected: f64,
    pub address_v4: String,
    pub address_v6: String,
}

impl ProbeRecord {
    /// Decodes an upstream response body for probe `id`.
    pub fn from_json(id: &str, body: &[u8]) -> Result<Self, ExporterError> {
        let wire: WireProbe =
            serde_json::from_slice(body).map_err(|e| ExporterError::DecodeFailure {
                id: id.to_string(),
                reason: e.to_string(),
                snippet: body_snippet(body, BODY_SNIPPET_LIMIT),
            })?;

        let decode_failure = |reason: String| ExporterError::DecodeFailure {
            id: id.to_string(),
            reason,
            snippet: body_snippet(body, BODY_SNIPPET_LIMIT),
        };

        let status = wire.status.unwrap_or_default();
        let raw_status = status
            .id
            .ok_or_else(|| decode_failure("missing status.id".to_string()))?;
        if !raw_status.is_finite() || raw_status.fract() != 0.0 {
            return Err(decode_failure(format!(
                "status.id {} is not an integer",
                raw_status
            )));
        }
        let status_id = raw_status as i64;

        Ok(Self {
            status_id,
            status_name: status.name,
            status_since: wire.status_since.unwrap_or_default(),
            total_uptime: wire.total_uptime.unwrap_or_default(),
            first_connected: wire.first_connected.unwrap_or_default(),
            last_connected: wire.last_connected.unwrap_or_default(),
            address_v4: wire.address_v4.unwrap_or_default(),
            address_v6: wire.address_v6.unwrap_or_default(),
        })
    }
}

/// Lossy UTF-8 rendering of at most `limit` bytes of `body`, cut on a char
/// boundary.
pub fn body_snippet(body: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= limit {
        return text.into_owned();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
