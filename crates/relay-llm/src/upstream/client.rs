use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use super::{Upstream, UpstreamRequest, UpstreamResponse};
use crate::error::GatewayError;

/// Provider Client backed by `reqwest`
pub struct HttpUpstream {
    name: String,
    client: Client,
}

impl HttpUpstream {
    /// Build a client with a connect timeout and, optionally, a total
    /// request timeout
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the TLS backend cannot initialize
    pub fn new(
        name: impl Into<String>,
        connect_timeout: Duration,
        total_timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder().connect_timeout(connect_timeout);
        if let Some(timeout) = total_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            client,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(provider = %self.name, error = %e, "upstream request failed");
            if e.is_timeout() {
                GatewayError::Timeout(e.to_string())
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(e.to_string())
                } else {
                    GatewayError::Stream(e.to_string())
                }
            })
        });

        Ok(UpstreamResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
