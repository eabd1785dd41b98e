//! Concurrent HTTP probe for exercising a server-side rate limiter.
//!
//! A fixed pool of [`worker::Worker`]s polls target URLs for a fixed window,
//! counts the `Allowed` and `Disallowed` decisions found in the response
//! bodies, and the [`coordinator::Coordinator`] sums the allowed counts.

pub mod classify;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod progress;
pub mod transport;
pub mod worker;

pub use coordinator::Coordinator;
pub use error::ProbeError;
pub use model::{Config, RunReport, WorkerSummary};
pub use transport::{HttpTransport, Transport};
pub use worker::Worker;
