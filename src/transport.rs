//! HTTP transport used by the workers.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;

use crate::error::{ProbeError, Result};

/// Response as seen by a worker: the status code and the body as a stream of
/// chunks. Dropping the stream releases the connection.
pub struct ProbeResponse {
    pub status: u16,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl ProbeResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

impl std::fmt::Debug for ProbeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Capability to issue a GET request. TLS, redirects and connection reuse are
/// left to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<ProbeResponse>;
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::from_client(builder.build()?))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_err(|e| ProbeError::Body(e.to_string()))
            .boxed();
        Ok(ProbeResponse { status, body })
    }
}
