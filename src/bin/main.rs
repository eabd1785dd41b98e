use throttle_probe::*;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use throttle_probe::progress::ProbeProgress;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URLs, assigned to workers round robin
    urls: Vec<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 10)]
    threads: usize,

    /// Duration of the run in seconds
    #[arg(short, long, default_value_t = 600)]
    duration: u64,

    /// Pause between two requests of a worker, in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    poll_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Also print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Hide the live worker spinners
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> model::Config {
        let defaults = model::Config::default();
        model::Config {
            threads: self.threads,
            urls: if self.urls.is_empty() {
                defaults.urls
            } else {
                self.urls
            },
            interval: Duration::from_secs(self.duration),
            poll_interval: Duration::from_millis(self.poll_ms),
            request_timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "throttle_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let (json, quiet) = (args.json, args.quiet);
    let config = args.into_config();

    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    let progress = if quiet {
        ProbeProgress::hidden()
    } else {
        ProbeProgress::new()
    };
    let coordinator = Coordinator::new(config)?.with_progress(progress);

    let report = coordinator.execute_run(transport).await;

    println!("{report}");
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
