//! Shared gateway state and its construction from configuration

use std::sync::Arc;

use relay_config::{Config, StreamMode};
use relay_core::HeaderRule;
use serde_json::Value;

use crate::backoff::Backoff;
use crate::fallback::SecondaryProvider;
use crate::history::{FileHistory, HistoryKind, HistoryRecord, HistorySink};
use crate::retry::RetryController;
use crate::sse::StreamLimits;
use crate::types::ChatRequest;
use crate::upstream::{HttpUpstream, PrimaryEndpoint, Upstream};

/// Shared state for gateway route handlers
#[derive(Clone)]
pub struct GatewayState {
    pub(crate) inner: Arc<GatewayStateInner>,
}

pub(crate) struct GatewayStateInner {
    pub(crate) primary: PrimaryEndpoint,
    pub(crate) secondary: Option<SecondaryProvider>,
    pub(crate) retry: RetryController,
    pub(crate) limits: StreamLimits,
    pub(crate) mode: StreamMode,
    pub(crate) history: Option<Arc<dyn HistorySink>>,
}

impl GatewayState {
    /// Build the state with HTTP upstreams and file history
    ///
    /// # Errors
    ///
    /// Returns an error if a setting cannot be turned into a working client
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let primary: Arc<dyn Upstream> = Arc::new(HttpUpstream::new(
            "primary",
            config.upstream.primary.connect_timeout()?,
            None,
        )?);

        let secondary = match config.upstream.secondary {
            Some(ref secondary) => {
                let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new(
                    "secondary",
                    config.upstream.primary.connect_timeout()?,
                    Some(secondary.timeout()?),
                )?);
                Some(upstream)
            }
            None => None,
        };

        let history = config.history.enabled.then(|| {
            tracing::info!(directory = %config.history.directory.display(), "recording history");
            Arc::new(FileHistory::new(&config.history.directory)) as Arc<dyn HistorySink>
        });

        Self::with_upstreams(config, primary, secondary, history)
    }

    /// Build the state around caller-supplied upstreams and history sink
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent
    pub fn with_upstreams(
        config: &Config,
        primary: Arc<dyn Upstream>,
        secondary: Option<Arc<dyn Upstream>>,
        history: Option<Arc<dyn HistorySink>>,
    ) -> anyhow::Result<Self> {
        let max_body_bytes = config.server.max_body_bytes;
        let header_rules = HeaderRule::compile_all(&config.upstream.primary.headers)?;

        let primary = PrimaryEndpoint::new(primary, &config.upstream.primary.base_url, header_rules, max_body_bytes)?;

        let secondary = match (secondary, &config.upstream.secondary) {
            (Some(upstream), Some(secondary_config)) => {
                Some(SecondaryProvider::new(upstream, secondary_config, max_body_bytes)?)
            }
            _ => None,
        };

        let retry = RetryController::new(
            config.retry.max_attempts,
            Backoff::from(config.retry.backoff.parse()?),
        );

        let limits = StreamLimits {
            read_timeout: config.streaming.read_timeout()?,
            max_line_bytes: config.streaming.max_line_bytes,
        };

        Ok(Self {
            inner: Arc::new(GatewayStateInner {
                primary,
                secondary,
                retry,
                limits,
                mode: config.streaming.mode,
                history,
            }),
        })
    }

    /// Persist a record on a detached task; failures are only logged
    pub(crate) fn record(&self, kind: HistoryKind, request: &ChatRequest, response: Value) {
        let Some(sink) = self.inner.history.clone() else {
            return;
        };

        let messages = serde_json::to_value(&request.messages).unwrap_or(Value::Null);
        let record = HistoryRecord::new(kind, messages, response);

        tokio::spawn(async move {
            if let Err(e) = sink.persist(record).await {
                tracing::warn!(error = %e, "failed to persist history record");
            }
        });
    }
}
