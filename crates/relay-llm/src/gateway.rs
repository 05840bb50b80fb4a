//! Request orchestration: fallback, retries, reassembly and history

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use relay_config::StreamMode;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::GatewayError;
use crate::fallback::{SecondaryAnswer, probe_secondary};
use crate::history::HistoryKind;
use crate::reassemble;
use crate::sse::{self, RelayEvent};
use crate::state::GatewayState;
use crate::types::{ChatCompletion, ChatRequest};
use crate::types::completion::COMPLETION_OBJECT;
use crate::upstream::UpstreamRequest;

/// Per-request delivery choices taken from the query string
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChatOptions {
    /// `?stream=true`
    pub(crate) stream: bool,
    /// `?buffered=true|false` overriding the configured mode
    pub(crate) buffered: Option<bool>,
}

/// Upstream response relayed as-is
#[derive(Debug)]
pub(crate) struct Relayed {
    pub(crate) status: StatusCode,
    pub(crate) content_type: Option<HeaderValue>,
    pub(crate) body: Bytes,
}

/// What the handler renders for a chat request
pub(crate) enum ChatOutcome {
    /// Non-streaming primary response
    Relayed(Relayed),
    /// Drained stream folded into one completion
    Buffered(ChatCompletion),
    /// Live pass-through; dropping `guard` aborts the upstream call
    Streaming {
        events: mpsc::Receiver<RelayEvent>,
        guard: DropGuard,
    },
    /// Secondary provider answer
    Secondary { answer: SecondaryAnswer, streaming: bool },
}

impl GatewayState {
    pub(crate) async fn chat(
        &self,
        headers: HeaderMap,
        options: ChatOptions,
        body: &[u8],
    ) -> Result<ChatOutcome, GatewayError> {
        let mut request: ChatRequest =
            serde_json::from_slice(body).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let streaming = request.is_stream() || options.stream;

        if let Some(answer) = probe_secondary(self.inner.secondary.as_ref(), &request).await {
            self.record(HistoryKind::Secondary, &request, first_message(&answer.completion));
            return Ok(ChatOutcome::Secondary { answer, streaming });
        }

        if !streaming {
            return self.complete(&headers, &request).await.map(ChatOutcome::Relayed);
        }

        request.set_stream(true);

        let buffered = options
            .buffered
            .unwrap_or(self.inner.mode == StreamMode::Buffered);

        if buffered {
            let completion = self.buffered(&headers, &request).await?;
            Ok(ChatOutcome::Buffered(completion))
        } else {
            let (events, guard) = self.pass_through(headers, request).await?;
            Ok(ChatOutcome::Streaming { events, guard })
        }
    }

    /// Non-streaming primary call; any upstream status is relayed
    async fn complete(&self, headers: &HeaderMap, request: &ChatRequest) -> Result<Relayed, GatewayError> {
        let payload = encode(request)?;
        let relayed = self
            .relay(|| self.inner.primary.chat_request(headers, &payload))
            .await?;

        if relayed.status.is_success() {
            let response = serde_json::from_slice::<Value>(&relayed.body).map_or_else(
                |_| Value::String(String::from_utf8_lossy(&relayed.body).into_owned()),
                |completion| first_message(&completion),
            );
            self.record(HistoryKind::Completion, request, response);
        }

        Ok(relayed)
    }

    async fn buffered(&self, headers: &HeaderMap, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        let mut completion = self
            .stream_attempts(headers, request, None)
            .await?
            .ok_or(GatewayError::EmptyCompletion)?;

        COMPLETION_OBJECT.clone_into(&mut completion.object);
        self.record(HistoryKind::Buffered, request, completion_message(&completion));

        Ok(completion)
    }

    /// Start the attempt loop on its own task and wait until the response
    /// can be committed
    ///
    /// Returns once an attempt got 200 OK, or with the error that ended the
    /// loop before that.
    async fn pass_through(
        &self,
        headers: HeaderMap,
        request: ChatRequest,
    ) -> Result<(mpsc::Receiver<RelayEvent>, DropGuard), GatewayError> {
        let (tx, mut events) = mpsc::channel(64);
        let token = CancellationToken::new();

        let state = self.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = task_token.cancelled() => {
                    tracing::debug!("caller disconnected, abandoning upstream stream");
                }
                () = state.run_stream(headers, request, tx) => {}
            }
        });

        // dropped with the handler future if the caller leaves before commit
        let guard = token.drop_guard();

        match events.recv().await {
            Some(RelayEvent::Opened) => Ok((events, guard)),
            Some(RelayEvent::Failed(e)) => Err(e),
            Some(RelayEvent::Data(_)) | None => Err(GatewayError::Internal(anyhow::anyhow!(
                "stream task ended before the response was opened"
            ))),
        }
    }

    async fn run_stream(self, headers: HeaderMap, request: ChatRequest, tx: mpsc::Sender<RelayEvent>) {
        match self.stream_attempts(&headers, &request, Some(&tx)).await {
            Ok(Some(completion)) => {
                self.record(HistoryKind::Stream, &request, completion_message(&completion));
            }
            Ok(None) => tracing::debug!("stream completed without any chunks"),
            Err(GatewayError::Cancelled) => {
                tracing::debug!("caller disconnected, stream abandoned");
            }
            Err(e) => {
                // nobody left to tell if this fails
                let _ = tx.send(RelayEvent::Failed(e)).await;
            }
        }
    }

    /// Retry loop around one streamed attempt
    ///
    /// Each attempt gets a fresh request and a fresh reassembler. When
    /// forwarding, `Opened` is sent once per attempt that got 200 OK.
    async fn stream_attempts(
        &self,
        headers: &HeaderMap,
        request: &ChatRequest,
        forward: Option<&mpsc::Sender<RelayEvent>>,
    ) -> Result<Option<ChatCompletion>, GatewayError> {
        let payload = encode(request)?;
        let primary = &self.inner.primary;
        let limits = self.inner.limits;

        self.inner
            .retry
            .run(primary.name(), |attempt| {
                let outbound = primary.chat_request(headers, &payload);
                async move {
                    tracing::debug!(provider = %attempt.provider, attempt = attempt.index + 1, "opening upstream stream");

                    let response = tokio::time::timeout(limits.read_timeout, primary.send(outbound))
                        .await
                        .map_err(|_| GatewayError::Timeout("no response headers from upstream".to_owned()))??;

                    if response.status != StatusCode::OK {
                        return Err(response.into_error(limits.read_timeout, primary.max_body_bytes()).await);
                    }

                    if let Some(tx) = forward {
                        tx.send(RelayEvent::Opened).await.map_err(|_| GatewayError::Cancelled)?;
                    }

                    reassemble::drain(sse::payloads(response.body, limits), forward).await
                }
            })
            .await
    }

    /// `GET {base}/models`, relayed verbatim
    pub(crate) async fn models(&self, headers: &HeaderMap) -> Result<Relayed, GatewayError> {
        self.relay(|| self.inner.primary.models_request(headers)).await
    }

    /// `GET {base}/generation?id=...`, relayed verbatim
    pub(crate) async fn generation(&self, headers: &HeaderMap, id: &str) -> Result<Relayed, GatewayError> {
        self.relay(|| self.inner.primary.generation_request(headers, id)).await
    }

    /// Send a buffered request through the retry loop and relay the answer
    async fn relay(&self, build: impl Fn() -> UpstreamRequest) -> Result<Relayed, GatewayError> {
        let primary = &self.inner.primary;
        let read_timeout = self.inner.limits.read_timeout;

        self.inner
            .retry
            .run(primary.name(), |_| {
                let outbound = build();
                async move {
                    let response = primary.send(outbound).await?;
                    let status = response.status;
                    let content_type = response.content_type();
                    let body = response.collect(read_timeout, primary.max_body_bytes()).await?;

                    Ok(Relayed {
                        status,
                        content_type,
                        body,
                    })
                }
            })
            .await
    }
}

fn encode(request: &ChatRequest) -> Result<Bytes, GatewayError> {
    serde_json::to_vec(request)
        .map(Bytes::from)
        .map_err(|e| GatewayError::Internal(e.into()))
}

/// First choice's message, or the whole payload when there is none
fn first_message(completion: &Value) -> Value {
    completion
        .pointer("/choices/0/message")
        .cloned()
        .unwrap_or_else(|| completion.clone())
}

fn completion_message(completion: &ChatCompletion) -> Value {
    let value = serde_json::to_value(completion).unwrap_or(Value::Null);
    first_message(&value)
}
