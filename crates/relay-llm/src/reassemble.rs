//! Stream Reassembler: folds chunk deltas into one completion

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::sse::{DONE_SENTINEL, RelayEvent, SsePayload};
use crate::types::{AssistantMessage, ChatCompletion, CompletionChoice, StreamChunk};

/// Accumulates the chunks of one attempt
///
/// The first decoded chunk fixes the response identity and the number of
/// choice slots. Content is append-only; role and finish reason are set by
/// the first non-empty value and never replaced.
#[derive(Debug, Default)]
pub struct Reassembler {
    completion: Option<ChatCompletion>,
}

impl Reassembler {
    /// Decode one `data:` payload and fold it in
    ///
    /// Returns `false` when the payload is not a valid chunk; the accumulated
    /// state is left untouched in that case.
    pub fn ingest_payload(&mut self, data: &str) -> bool {
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                self.ingest(chunk);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, data = %data, "skipping malformed stream chunk");
                false
            }
        }
    }

    pub fn ingest(&mut self, chunk: StreamChunk) {
        let completion = self.completion.get_or_insert_with(|| ChatCompletion {
            id: chunk.id.clone(),
            object: chunk.object.clone(),
            created: chunk.created,
            model: chunk.model.clone(),
            choices: (0..chunk.choices.len())
                .map(|index| CompletionChoice {
                    index,
                    message: AssistantMessage::default(),
                    finish_reason: None,
                })
                .collect(),
            usage: None,
        });

        for choice in chunk.choices {
            let Some(slot) = completion.choices.get_mut(choice.index) else {
                tracing::debug!(index = choice.index, "ignoring delta for unallocated choice");
                continue;
            };

            if let Some(content) = choice.delta.content {
                slot.message.content.push_str(&content);
            }

            if let Some(role) = choice.delta.role
                && !role.is_empty()
                && slot.message.role.is_empty()
            {
                slot.message.role = role;
            }

            if let Some(reason) = choice.finish_reason
                && !reason.is_empty()
                && slot.finish_reason.is_none()
            {
                slot.finish_reason = Some(reason);
            }
        }

        if chunk.usage.is_some() {
            completion.usage = chunk.usage;
        }
    }

    /// Accumulated completion, or `None` if no chunk was ever decoded
    pub fn finish(self) -> Option<ChatCompletion> {
        self.completion
    }
}

/// Consume one attempt's payloads until `[DONE]` or end of stream
///
/// Every valid payload is forwarded verbatim when `forward` is set, so
/// pass-through and accumulation share one read of the stream. Malformed
/// chunks are neither folded in nor forwarded.
///
/// # Errors
///
/// Propagates stream failures, and returns `GatewayError::Cancelled` when
/// the forwarding channel has been closed by the caller.
pub async fn drain<S>(
    payloads: S,
    forward: Option<&mpsc::Sender<RelayEvent>>,
) -> Result<Option<ChatCompletion>, GatewayError>
where
    S: Stream<Item = Result<SsePayload, GatewayError>>,
{
    let mut payloads = std::pin::pin!(payloads);
    let mut reassembler = Reassembler::default();

    while let Some(payload) = payloads.next().await {
        match payload? {
            SsePayload::Done => {
                relay(forward, DONE_SENTINEL.to_owned()).await?;
                break;
            }
            SsePayload::Data(data) => {
                if reassembler.ingest_payload(&data) {
                    relay(forward, data).await?;
                }
            }
        }
    }

    Ok(reassembler.finish())
}

async fn relay(forward: Option<&mpsc::Sender<RelayEvent>>, data: String) -> Result<(), GatewayError> {
    let Some(tx) = forward else { return Ok(()) };
    tx.send(RelayEvent::Data(data)).await.map_err(|_| GatewayError::Cancelled)
}
