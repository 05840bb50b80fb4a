//! Provider Fallback Selector
//!
//! Aliased models get one cheap probe against the secondary provider. Any
//! failure abandons the secondary and the original request goes through the
//! primary provider's full retry path.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use indexmap::IndexMap;
use relay_config::SecondaryConfig;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::error::GatewayError;
use crate::types::ChatRequest;
use crate::upstream::{Upstream, UpstreamRequest};

/// Successful secondary answer
#[derive(Debug, Clone)]
pub struct SecondaryAnswer {
    /// Body exactly as received
    pub body: Bytes,
    /// Same body, decoded
    pub completion: Value,
}

/// Non-streaming provider reached only through model aliases
pub struct SecondaryProvider {
    upstream: Arc<dyn Upstream>,
    url: Url,
    api_key: SecretString,
    aliases: IndexMap<String, String>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl SecondaryProvider {
    /// # Errors
    ///
    /// Returns an error if the configured timeout is malformed
    pub fn new(upstream: Arc<dyn Upstream>, config: &SecondaryConfig, max_body_bytes: usize) -> anyhow::Result<Self> {
        Ok(Self {
            upstream,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            aliases: config.aliases.clone(),
            timeout: config.timeout()?,
            max_body_bytes,
        })
    }

    pub fn name(&self) -> &str {
        self.upstream.name()
    }

    /// Native model identifier for an aliased model
    pub fn target_for(&self, model: &str) -> Option<&str> {
        self.aliases.get(model).map(String::as_str)
    }

    /// One attempt, no retries; anything but 200 OK with a JSON body fails
    ///
    /// # Errors
    ///
    /// Returns the transport error, the upstream status, or a decode error
    pub async fn complete(&self, request: &ChatRequest, target: &str) -> Result<SecondaryAnswer, GatewayError> {
        let mut rewritten = request.clone();
        target.clone_into(&mut rewritten.model);
        rewritten.set_stream(false);

        let body = serde_json::to_vec(&rewritten).map_err(|e| GatewayError::Internal(e.into()))?;

        let mut authorization = HeaderValue::try_from(format!("Bearer {}", self.api_key.expose_secret()))
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("invalid secondary api key: {e}")))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .upstream
            .send(UpstreamRequest {
                method: Method::POST,
                url: self.url.clone(),
                headers,
                body: Some(Bytes::from(body)),
            })
            .await?;

        if response.status != StatusCode::OK {
            return Err(response.into_error(self.timeout, self.max_body_bytes).await);
        }

        let body = response.collect(self.timeout, self.max_body_bytes).await?;
        let completion = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Stream(format!("secondary returned an undecodable body: {e}")))?;

        Ok(SecondaryAnswer { body, completion })
    }
}

/// Try the secondary provider when `request.model` is one of its aliases
///
/// `None` means the primary provider must serve the original, unmodified
/// request: either no alias matched or the probe failed.
pub async fn probe_secondary(secondary: Option<&SecondaryProvider>, request: &ChatRequest) -> Option<SecondaryAnswer> {
    let secondary = secondary?;
    let target = secondary.target_for(&request.model)?;

    match secondary.complete(request, target).await {
        Ok(answer) => Some(answer),
        Err(e) => {
            tracing::warn!(
                provider = %secondary.name(),
                model = %request.model,
                error = %e,
                "secondary provider failed, falling back to primary"
            );
            None
        }
    }
}
