use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::error::{ProbeError, Result};

/// Demo endpoints of the throttle script, one rate limited by the caller's
/// address and one with a spoofed address parameter.
pub const DEFAULT_URLS: [&str; 2] = [
    "https://www.nighthour.sg/csp-violation-report-endpoint/throttle-demo.php",
    "https://www.nighthour.sg/csp-violation-report-endpoint/throttle-demo.php?ip=192.168.230.76",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub threads: usize,
    pub urls: Vec<String>,
    /// Total wall-clock time each worker keeps probing.
    pub interval: Duration,
    /// Pause between two probes of the same worker.
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 10,
            urls: DEFAULT_URLS.iter().map(|u| u.to_string()).collect(),
            interval: Duration::from_secs(10 * 60),
            poll_interval: Duration::from_millis(1000),
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ProbeError::Config("thread count must be positive".into()));
        }
        if self.urls.is_empty() {
            return Err(ProbeError::Config("at least one target url is required".into()));
        }
        if self.interval.is_zero() {
            return Err(ProbeError::Config("run interval must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ProbeError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }
}

/// Per-worker counters. `total == http_ok + http_error` holds after every
/// completed probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total: u64,
    pub http_ok: u64,
    pub http_error: u64,
    pub allowed: u64,
    pub disallowed: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkerSummary {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkerSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl fmt::Display for WorkerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        write!(
            f,
            "Thread: {} , total: {} , httpok: {} , httperror: {} , allowed: {} , disallowed: {} , starttime: {} , endtime: {} , elapsed time: {}",
            self.name,
            c.total,
            c.http_ok,
            c.http_error,
            c.allowed,
            c.disallowed,
            self.start.timestamp_millis(),
            self.end.timestamp_millis(),
            self.elapsed().num_milliseconds()
        )
    }
}

/// Outcome of one coordinated run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// Summaries of the workers that were joined, ordered by worker index.
    pub workers: Vec<WorkerSummary>,
    pub total_allowed: u64,
    /// Workers whose task could not be joined; their counts are missing from
    /// `total_allowed`.
    pub failed_workers: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total allowed for all threads is {}", self.total_allowed)
    }
}
