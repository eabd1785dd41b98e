use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{ProbeError, Result};
use crate::model::{Config, RunReport};
use crate::progress::ProbeProgress;
use crate::transport::Transport;
use crate::worker::Worker;

/// Launches a fixed pool of workers and aggregates their allowed counts.
pub struct Coordinator {
    config: Config,
    progress: ProbeProgress,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress: ProbeProgress::hidden(),
        })
    }

    pub fn with_progress(mut self, progress: ProbeProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Workers `t0..tN`, worker `i` targeting `urls[i % urls.len()]`.
    pub fn build_workers(&self, transport: Arc<dyn Transport>) -> Vec<Worker> {
        let urls = &self.config.urls;
        (0..self.config.threads)
            .map(|i| {
                let name = format!("t{i}");
                let bar = self.progress.worker_bar(&name);
                Worker::new(
                    name,
                    urls[i % urls.len()].clone(),
                    self.config.interval,
                    self.config.poll_interval,
                    transport.clone(),
                )
                .with_bar(bar)
            })
            .collect()
    }

    /// Runs every worker concurrently and waits for all of them.
    ///
    /// A worker task that cannot be joined is logged and left out of the
    /// total; the remaining workers are still collected.
    pub async fn execute_run(&self, transport: Arc<dyn Transport>) -> RunReport {
        let workers = self.build_workers(transport);
        info!(
            threads = workers.len(),
            urls = self.config.urls.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            "starting run"
        );

        let mut set = JoinSet::new();
        for (index, mut worker) in workers.into_iter().enumerate() {
            set.spawn(async move {
                worker.run().await;
                (index, worker)
            });
        }

        let mut finished = Vec::with_capacity(self.config.threads);
        let mut failed_workers = 0;
        while let Some(res) = set.join_next().await {
            match res {
                Ok(done) => finished.push(done),
                Err(e) => {
                    let e = ProbeError::Join(e.to_string());
                    error!(error = %e, "worker did not complete");
                    failed_workers += 1;
                }
            }
        }
        finished.sort_by_key(|(index, _)| *index);

        let report = aggregate(finished.iter().map(|(_, worker)| worker), failed_workers);
        info!(
            total_allowed = report.total_allowed,
            failed_workers = report.failed_workers,
            "run finished"
        );
        report
    }
}

/// Sums the allowed counts of finished workers.
pub fn aggregate<'a>(
    workers: impl IntoIterator<Item = &'a Worker>,
    failed_workers: usize,
) -> RunReport {
    let mut report = RunReport {
        failed_workers,
        ..Default::default()
    };
    for worker in workers {
        report.total_allowed += worker.allowed_count();
        report.workers.push(worker.summary());
    }
    report
}
