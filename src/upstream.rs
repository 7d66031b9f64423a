//! Client for the RIPE Atlas probe API.
//!
//! One `UpstreamClient` is shared by all requests; `reqwest::Client` keeps an
//! internally synchronized connection pool. Each fetch is a single GET with no
//! retry, bounded by the configured timeout.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ExporterError;
use crate::probe::ProbeRecord;

pub const DEFAULT_UPSTREAM_URL: &str = "https://atlas.ripe.net";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
/// Largest probe document accepted; real ones are a few KB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Settings for the upstream HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Scheme and host of the API, e.g. `https://atlas.ripe.net`.
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("atlas-probe-exporter/{}", env!("CARGO_PKG_VERSION"))
}

/// Result of a successful fetch together with how long the round trip took.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub record: ProbeRecord,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the probe resource for `id`.
    pub fn probe_url(&self, id: &str) -> String {
        format!("{}/api/v2/probes/{}/", self.base_url, id)
    }

    /// Fetches and decodes the probe with the given identifier.
    ///
    /// Non-2xx answers are reported as `UpstreamUnavailable` and their body is
    /// never decoded. Dropping the returned future aborts the request.
    pub async fn fetch_probe(&self, id: &str) -> Result<FetchOutcome, ExporterError> {
        let url = self.probe_url(id);
        let start = Instant::now();
        debug!("Fetching probe {} from {}", id, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(id, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::UpstreamUnavailable {
                id: id.to_string(),
                reason: format!("upstream answered HTTP {}", status),
            });
        }

        let body = self.read_body(id, response).await?;

        let record = ProbeRecord::from_json(id, &body)?;
        let elapsed = start.elapsed();
        debug!(
            "Fetched probe {} ({} bytes) in {:.3}ms",
            id,
            body.len(),
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(FetchOutcome { record, elapsed })
    }

    /// Reads the body in chunks, refusing anything above `MAX_BODY_BYTES`.
    async fn read_body(
        &self,
        id: &str,
        mut response: reqwest::Response,
    ) -> Result<Vec<u8>, ExporterError> {
        let too_large = || ExporterError::UpstreamBodyUnreadable {
            id: id.to_string(),
            reason: format!("body exceeds {} bytes", MAX_BODY_BYTES),
        };

        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(id)
            } else {
                ExporterError::UpstreamBodyUnreadable {
                    id: id.to_string(),
                    reason: error_chain(&e),
                }
            }
        })? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn transport_error(&self, id: &str, e: &reqwest::Error) -> ExporterError {
        if e.is_timeout() {
            self.timeout_error(id)
        } else {
            ExporterError::UpstreamUnavailable {
                id: id.to_string(),
                reason: error_chain(e),
            }
        }
    }

    fn timeout_error(&self, id: &str) -> ExporterError {
        ExporterError::UpstreamTimeout {
            id: id.to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

/// Joins an error with all of its sources, `reqwest` keeps the useful part
/// (DNS, TLS, connection refused) in the source chain.
fn error_chain(e: &dyn StdError) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url_strips_trailing_slash() {
        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:8080/".into(),
            ..UpstreamConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080");
        assert_eq!(
            client.probe_url("6001"),
            "http://127.0.0.1:8080/api/v2/probes/6001/"
        );
    }

    #[test]
    fn test_default_config() {
        let cfg = UpstreamConfig::default();
        assert_eq!(cfg.base_url, "https://atlas.ripe.net");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(cfg.user_agent.starts_with("atlas-probe-exporter/"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_secs(2),
            ..UpstreamConfig::default()
        })
        .unwrap();

        let err = client.fetch_probe("1").await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert_eq!(err.probe_id(), "1");
    }
}
