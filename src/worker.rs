use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::classify::LineScanner;
use crate::model::{Counters, WorkerSummary};
use crate::progress::WorkerBar;
use crate::transport::Transport;

/// One probing stream against a single target URL.
///
/// The worker owns its counters; nothing else mutates them. Readers get the
/// worker back from its task only after the task has completed.
pub struct Worker {
    name: String,
    url: String,
    interval: Duration,
    poll_interval: Duration,
    transport: Arc<dyn Transport>,
    bar: WorkerBar,
    counters: Counters,
    started: Option<(DateTime<Utc>, Instant)>,
    ended: Option<DateTime<Utc>>,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        interval: Duration,
        poll_interval: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            interval,
            poll_interval,
            transport,
            bar: WorkerBar::hidden(),
            counters: Counters::default(),
            started: None,
            ended: None,
        }
    }

    pub fn with_bar(mut self, bar: WorkerBar) -> Self {
        self.bar = bar;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Allowed responses seen so far. Only meaningful once [`Worker::run`]
    /// has returned.
    pub fn allowed_count(&self) -> u64 {
        self.counters.allowed
    }

    /// Probes until the interval has elapsed, then prints the summary.
    ///
    /// The deadline is checked after each probe and pause, so the last probe
    /// may start just before the deadline and the run overshoots by at most
    /// one request plus one poll interval.
    pub async fn run(&mut self) -> WorkerSummary {
        let (_, begin) = *self.started.get_or_insert_with(|| (Utc::now(), Instant::now()));
        debug!(worker = %self.name, url = %self.url, "worker started");

        loop {
            self.probe_once().await;
            tokio::time::sleep(self.poll_interval).await;
            if begin.elapsed() > self.interval {
                break;
            }
        }

        self.ended = Some(Utc::now());
        self.bar.finish();

        let summary = self.summary();
        info!(
            worker = %summary.name,
            total = summary.counters.total,
            allowed = summary.counters.allowed,
            disallowed = summary.counters.disallowed,
            "worker finished"
        );
        self.bar.println(&summary.to_string());
        summary
    }

    /// Issues one GET and classifies the response.
    ///
    /// Failures never escape: a failed connection or body read counts as an
    /// http error and the next iteration is the retry.
    pub async fn probe_once(&mut self) {
        self.counters.total += 1;

        let response = match self.transport.get(&self.url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(worker = %self.name, url = %self.url, error = %e, "request failed");
                self.counters.http_error += 1;
                self.bar.update(&self.counters, None);
                return;
            }
        };

        let status_ok = response.is_ok();
        let mut scanner = LineScanner::new();
        let mut body = response.body;
        let mut body_ok = true;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => scanner.feed(&chunk),
                Err(e) => {
                    warn!(worker = %self.name, url = %self.url, error = %e, "reading body failed");
                    body_ok = false;
                    break;
                }
            }
        }
        // closing the stream cannot fail; dropping it is the release
        drop(body);

        let tally = scanner.finish();
        self.counters.allowed += tally.allowed;
        self.counters.disallowed += tally.disallowed;
        if status_ok && body_ok {
            self.counters.http_ok += 1;
        } else {
            self.counters.http_error += 1;
        }
        self.bar.update(&self.counters, scanner.last_marked());
    }

    /// Snapshot of the worker's state. End time is "now" while still running.
    pub fn summary(&self) -> WorkerSummary {
        let now = Utc::now();
        let start = self.started.map(|(start, _)| start).unwrap_or(now);
        WorkerSummary {
            name: self.name.clone(),
            url: self.url.clone(),
            counters: self.counters,
            start,
            end: self.ended.unwrap_or(now),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ProbeError, Result};
    use crate::transport::ProbeResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a [`MockTransport`] answers with.
    #[derive(Clone, Debug)]
    pub(crate) enum Reply {
        Body(u16, &'static str),
        /// Body whose stream fails after the given text
        Truncated(u16, &'static str),
        ConnectError,
    }

    pub(crate) struct MockTransport {
        reply: Reply,
        pub(crate) calls: AtomicUsize,
    }

    impl MockTransport {
        pub(crate) fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, _url: &str) -> Result<ProbeResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply.clone() {
                Reply::Body(status, body) => Ok(ProbeResponse {
                    status,
                    body: stream::iter(vec![Ok(Bytes::from_static(body.as_bytes()))]).boxed(),
                }),
                Reply::Truncated(status, body) => Ok(ProbeResponse {
                    status,
                    body: stream::iter(vec![
                        Ok(Bytes::from_static(body.as_bytes())),
                        Err(ProbeError::Body("connection reset".into())),
                    ])
                    .boxed(),
                }),
                Reply::ConnectError => Err(ProbeError::Body("connection refused".into())),
            }
        }
    }

    fn worker(reply: Reply) -> Worker {
        Worker::new(
            "t0",
            "http://localhost/",
            Duration::from_secs(10),
            Duration::from_secs(1),
            MockTransport::new(reply),
        )
    }

    const MIXED: &str = "Allowed : a\nAllowed : b\nDisallowed : c\n<br>\nAllowed : d";

    #[tokio::test]
    async fn probe_counts_markers_on_ok() {
        let mut w = worker(Reply::Body(200, MIXED));
        w.probe_once().await;
        assert_eq!(
            w.counters(),
            Counters {
                total: 1,
                http_ok: 1,
                http_error: 0,
                allowed: 3,
                disallowed: 1,
            }
        );
    }

    #[tokio::test]
    async fn probe_counts_markers_regardless_of_status() {
        let mut w = worker(Reply::Body(429, MIXED));
        w.probe_once().await;
        let c = w.counters();
        assert_eq!((c.total, c.http_ok, c.http_error), (1, 0, 1));
        assert_eq!((c.allowed, c.disallowed), (3, 1));
    }

    #[tokio::test]
    async fn redirect_status_is_an_error() {
        let mut w = worker(Reply::Body(302, ""));
        w.probe_once().await;
        assert_eq!(w.counters().http_error, 1);
        assert_eq!(w.counters().http_ok, 0);
    }

    #[tokio::test]
    async fn connect_error_counts_as_http_error() {
        let mut w = worker(Reply::ConnectError);
        w.probe_once().await;
        w.probe_once().await;
        let c = w.counters();
        assert_eq!((c.total, c.http_ok, c.http_error), (2, 0, 2));
        assert_eq!((c.allowed, c.disallowed), (0, 0));
    }

    #[tokio::test]
    async fn body_failure_keeps_lines_read_so_far() {
        let mut w = worker(Reply::Truncated(200, "Allowed : a\nDisallowed : b\n"));
        w.probe_once().await;
        let c = w.counters();
        assert_eq!((c.total, c.http_ok, c.http_error), (1, 0, 1));
        assert_eq!((c.allowed, c.disallowed), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_worker_runs_for_interval() {
        let transport = MockTransport::new(Reply::ConnectError);
        let mut w = Worker::new(
            "t0",
            "http://localhost/",
            Duration::from_secs(10),
            Duration::from_secs(1),
            transport.clone(),
        );
        let summary = w.run().await;

        let calls = transport.calls.load(Ordering::SeqCst) as u64;
        assert!((9..=11).contains(&calls), "unexpected iteration count {calls}");
        assert_eq!(summary.counters.total, calls);
        assert_eq!(summary.counters.http_ok, 0);
        assert_eq!(summary.counters.http_error, summary.counters.total);
    }

    #[tokio::test(start_paused = true)]
    async fn counters_stay_consistent_after_run() {
        let mut w = worker(Reply::Body(200, "Allowed : a\n"));
        let summary = w.run().await;
        let c = summary.counters;
        assert_eq!(c.total, c.http_ok + c.http_error);
        assert!(c.allowed + c.disallowed <= c.total);
        assert_eq!(c.allowed, c.total);
    }

    #[tokio::test(start_paused = true)]
    async fn allowed_count_is_stable_after_run() {
        let mut w = worker(Reply::Body(200, "Allowed : a\n"));
        w.run().await;
        let first = w.allowed_count();
        assert!(first > 0);
        assert_eq!(w.allowed_count(), first);
        assert_eq!(w.allowed_count(), first);
    }
}
