//! Provider Client: one HTTP exchange with an upstream, no retries

mod client;
mod primary;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use url::Url;

pub use client::HttpUpstream;
pub use primary::PrimaryEndpoint;
use crate::error::GatewayError;

/// Upstream response body, consumed at most once
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Fully formed outbound request
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Status, headers and an open body handle
///
/// Dropping the response closes the underlying connection; the body can
/// only be taken once, so it can never be closed twice.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<HeaderValue> {
        self.headers.get(header::CONTENT_TYPE).cloned()
    }

    /// Buffer the whole body
    ///
    /// Each read must complete within `read_timeout`. Bytes past `max_bytes`
    /// are dropped.
    pub async fn collect(self, read_timeout: Duration, max_bytes: usize) -> Result<Bytes, GatewayError> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        let mut truncated = false;

        loop {
            let next = tokio::time::timeout(read_timeout, body.next())
                .await
                .map_err(|_| GatewayError::Timeout(format!("no response data for {}s", read_timeout.as_secs())))?;

            let Some(bytes) = next else { break };
            let bytes = bytes?;

            let room = max_bytes.saturating_sub(buffer.len());
            if bytes.len() > room {
                truncated = true;
            }
            buffer.extend_from_slice(&bytes[..bytes.len().min(room)]);
        }

        if truncated {
            tracing::warn!(max_bytes, "upstream response body truncated");
        }

        Ok(buffer.freeze())
    }

    /// Turn a non-OK response into an error carrying its status and body
    pub async fn into_error(self, read_timeout: Duration, max_bytes: usize) -> GatewayError {
        let status = self.status;
        let body = self.collect(read_timeout, max_bytes).await.unwrap_or_default();
        tracing::warn!(status = %status, "upstream returned error status");
        GatewayError::Upstream { status, body }
    }
}

/// An opaque HTTP endpoint
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Issue exactly one request and return once response headers arrive
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError>;
}
