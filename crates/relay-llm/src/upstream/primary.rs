use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use relay_core::{HeaderRule, apply_header_rules};
use url::Url;

use super::{Upstream, UpstreamRequest, UpstreamResponse};
use crate::error::GatewayError;

/// The primary provider with its endpoints and outbound header policy
pub struct PrimaryEndpoint {
    upstream: Arc<dyn Upstream>,
    chat_url: Url,
    models_url: Url,
    generation_url: Url,
    header_rules: Vec<HeaderRule>,
    max_body_bytes: usize,
}

impl PrimaryEndpoint {
    /// # Errors
    ///
    /// Returns an error if an endpoint URL cannot be derived from `base_url`
    pub fn new(
        upstream: Arc<dyn Upstream>,
        base_url: &Url,
        header_rules: Vec<HeaderRule>,
        max_body_bytes: usize,
    ) -> anyhow::Result<Self> {
        let base = base_url.as_str().trim_end_matches('/');
        let endpoint = |path: &str| {
            Url::parse(&format!("{base}/{path}")).map_err(|e| anyhow::anyhow!("invalid upstream URL {base}/{path}: {e}"))
        };

        Ok(Self {
            upstream,
            chat_url: endpoint("chat/completions")?,
            models_url: endpoint("models")?,
            generation_url: endpoint("generation")?,
            header_rules,
            max_body_bytes,
        })
    }

    pub fn name(&self) -> &str {
        self.upstream.name()
    }

    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Build a fresh chat request for one attempt
    ///
    /// Bodies above the configured cap are truncated.
    pub fn chat_request(&self, inbound: &HeaderMap, body: &Bytes) -> UpstreamRequest {
        let mut headers = apply_header_rules(inbound, &self.header_rules);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = if body.len() > self.max_body_bytes {
            tracing::warn!(
                size = body.len(),
                max_body_bytes = self.max_body_bytes,
                "outbound body exceeds cap, truncating"
            );
            body.slice(..self.max_body_bytes)
        } else {
            body.clone()
        };

        UpstreamRequest {
            method: Method::POST,
            url: self.chat_url.clone(),
            headers,
            body: Some(body),
        }
    }

    /// `GET {base}/models`
    pub fn models_request(&self, inbound: &HeaderMap) -> UpstreamRequest {
        self.get_request(inbound, self.models_url.clone())
    }

    /// `GET {base}/generation?id=...`
    pub fn generation_request(&self, inbound: &HeaderMap, id: &str) -> UpstreamRequest {
        let mut url = self.generation_url.clone();
        url.query_pairs_mut().append_pair("id", id);
        self.get_request(inbound, url)
    }

    fn get_request(&self, inbound: &HeaderMap, url: Url) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::GET,
            url,
            headers: apply_header_rules(inbound, &self.header_rules),
            body: None,
        }
    }

    pub async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError> {
        self.upstream.send(request).await
    }
}
