//! Health statistics for the exporter.
//!
//! Tracks scrape outcomes, upstream latency and HTTP request rates, and
//! renders them as the plain-text table served on `/health`.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::ExporterError;

/// Running statistics for a single measurement.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Point-in-time copy of a [`Stat`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatSnapshot {
    pub last: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
}

/// Thread-safe wrapper around [`RunningStat`].
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> StatSnapshot {
        self.inner
            .lock()
            .map(|s| StatSnapshot {
                last: s.last,
                avg: s.avg(),
                max: s.max,
                min: s.min,
                count: s.count,
            })
            .unwrap_or_default()
    }
}

/// Sliding window of HTTP request timestamps (ten minutes).
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    const WINDOW: Duration = Duration::from_secs(600);

    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > Self::WINDOW)
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        let Ok(guard) = self.inner.lock() else {
            return 0;
        };
        let now = Instant::now();
        guard
            .iter()
            .filter(|&&t| now.duration_since(t) <= Duration::from_secs(60))
            .count() as u64
    }
}

/// Counters and timings collected while serving requests.
pub struct HealthStats {
    pub scrapes_total: AtomicU64,
    pub scrape_success: AtomicU64,
    pub not_found: AtomicU64,

    // Failures by kind
    pub upstream_unavailable: AtomicU64,
    pub upstream_timeouts: AtomicU64,
    pub body_read_errors: AtomicU64,
    pub decode_errors: AtomicU64,
    pub render_errors: AtomicU64,

    pub upstream_duration_ms: Stat,
    pub request_duration_ms: Stat,
    pub response_size_bytes: Stat,
    pub time_series: Stat,

    pub http_request_timestamps: RequestTimestamps,
    pub start_time: Instant,
    pub last_success: StdRwLock<Option<DateTime<Utc>>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            scrapes_total: AtomicU64::new(0),
            scrape_success: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            upstream_unavailable: AtomicU64::new(0),
            upstream_timeouts: AtomicU64::new(0),
            body_read_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            upstream_duration_ms: Stat::default(),
            request_duration_ms: Stat::default(),
            response_size_bytes: Stat::default(),
            time_series: Stat::default(),
            http_request_timestamps: RequestTimestamps::default(),
            start_time: Instant::now(),
            last_success: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(
        &self,
        upstream_ms: f64,
        request_ms: f64,
        response_bytes: usize,
        series: usize,
    ) {
        self.scrapes_total.fetch_add(1, Ordering::Relaxed);
        self.scrape_success.fetch_add(1, Ordering::Relaxed);
        self.upstream_duration_ms.add_sample(upstream_ms);
        self.request_duration_ms.add_sample(request_ms);
        self.response_size_bytes.add_sample(response_bytes as f64);
        self.time_series.add_sample(series as f64);
        if let Ok(mut guard) = self.last_success.write() {
            *guard = Some(Utc::now());
        }
    }

    pub fn record_failure(&self, err: &ExporterError, request_ms: f64) {
        self.scrapes_total.fetch_add(1, Ordering::Relaxed);
        self.request_duration_ms.add_sample(request_ms);
        let counter = match err {
            ExporterError::UpstreamUnavailable { .. } => &self.upstream_unavailable,
            ExporterError::UpstreamTimeout { .. } => &self.upstream_timeouts,
            ExporterError::UpstreamBodyUnreadable { .. } => &self.body_read_errors,
            ExporterError::DecodeFailure { .. } => &self.decode_errors,
            ExporterError::RegistrationFailure { .. } | ExporterError::EncodingFailure { .. } => {
                &self.render_errors
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures_total(&self) -> u64 {
        [
            &self.upstream_unavailable,
            &self.upstream_timeouts,
            &self.body_read_errors,
            &self.decode_errors,
            &self.render_errors,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }

    /// Percentage of scrapes that produced metrics; 100 before the first one.
    pub fn success_rate(&self) -> f64 {
        let total = self.scrapes_total.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            self.scrape_success.load(Ordering::Relaxed) as f64 / total as f64 * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn last_success_str(&self) -> String {
        self.last_success
            .read()
            .ok()
            .and_then(|guard| *guard)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn render_table(&self) -> String {
        const LEFT: usize = 26;
        const COL: usize = 12;

        let mut out = String::new();
        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();
        writeln!(
            out,
            "{:LEFT$} | {:^COL$} | {:^COL$} | {:^COL$} | {:^COL$}",
            "", "current", "average", "max", "min"
        )
        .ok();

        let stat_row = |out: &mut String, name: &str, s: StatSnapshot, precision: usize| {
            writeln!(
                out,
                "{:LEFT$} | {:^COL$} | {:^COL$} | {:^COL$} | {:^COL$}",
                name,
                format!("{:.precision$}", s.last),
                format!("{:.precision$}", s.avg),
                format!("{:.precision$}", s.max),
                format!("{:.precision$}", s.min),
            )
            .ok();
        };
        let value_row = |out: &mut String, name: &str, value: String| {
            writeln!(out, "{:LEFT$} | {:^COL$}", name, value).ok();
        };

        writeln!(out).ok();
        writeln!(out, "SCRAPES").ok();
        writeln!(out, "-------").ok();
        value_row(
            &mut out,
            "scrapes_total",
            self.scrapes_total.load(Ordering::Relaxed).to_string(),
        );
        value_row(
            &mut out,
            "scrape_success",
            self.scrape_success.load(Ordering::Relaxed).to_string(),
        );
        value_row(
            &mut out,
            "success_rate (%)",
            format!("{:.1}", self.success_rate()),
        );
        value_row(
            &mut out,
            "invalid_probe_ids",
            self.not_found.load(Ordering::Relaxed).to_string(),
        );
        value_row(&mut out, "last_success", self.last_success_str());

        writeln!(out).ok();
        writeln!(out, "FAILURES").ok();
        writeln!(out, "--------").ok();
        for (name, counter) in [
            ("upstream_unavailable", &self.upstream_unavailable),
            ("upstream_timeout", &self.upstream_timeouts),
            ("upstream_body_unreadable", &self.body_read_errors),
            ("decode_failure", &self.decode_errors),
            ("render_failure", &self.render_errors),
        ] {
            value_row(&mut out, name, counter.load(Ordering::Relaxed).to_string());
        }

        writeln!(out).ok();
        writeln!(out, "TIMINGS").ok();
        writeln!(out, "-------").ok();
        stat_row(
            &mut out,
            "upstream_duration (ms)",
            self.upstream_duration_ms.snapshot(),
            1,
        );
        stat_row(
            &mut out,
            "request_duration (ms)",
            self.request_duration_ms.snapshot(),
            1,
        );
        stat_row(
            &mut out,
            "response_size (bytes)",
            self.response_size_bytes.snapshot(),
            0,
        );
        stat_row(&mut out, "time_series", self.time_series.snapshot(), 0);

        writeln!(out).ok();
        writeln!(out, "HTTP SERVER").ok();
        writeln!(out, "-----------").ok();
        value_row(
            &mut out,
            "requests_last_minute",
            self.http_request_timestamps
                .count_last_minute()
                .to_string(),
        );

        out
    }
}
