//! SSE framing over an upstream body
//!
//! The raw byte stream is guarded by an inactivity timeout and a line length
//! limit before `eventsource-stream` splits it into events.

use std::time::Duration;

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt, stream};

use crate::error::GatewayError;
use crate::upstream::BodyStream;

/// Payload that terminates a stream cleanly
pub const DONE_SENTINEL: &str = "[DONE]";

/// Bounds applied while reading an event stream
#[derive(Debug, Clone, Copy)]
pub struct StreamLimits {
    /// Longest gap between two reads
    pub read_timeout: Duration,
    /// Longest single line
    pub max_line_bytes: usize,
}

/// One non-empty `data:` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsePayload {
    Data(String),
    Done,
}

/// Progress of a relayed stream, as seen by the task feeding the caller
#[derive(Debug)]
pub enum RelayEvent {
    /// An attempt got a 200 OK and its events follow
    Opened,
    /// Raw payload to forward as one SSE event
    Data(String),
    /// The stream cannot continue
    Failed(GatewayError),
}

/// Decode an upstream body into SSE payloads
///
/// Comment lines and empty payloads are dropped. The stream ends with an
/// error when the upstream stalls, a line grows past the limit, or the
/// connection breaks.
pub fn payloads(body: BodyStream, limits: StreamLimits) -> impl Stream<Item = Result<SsePayload, GatewayError>> + Send {
    guarded(body, limits).eventsource().filter_map(|event| async move {
        match event {
            Ok(event) => {
                let data = event.data.trim();
                if data.is_empty() {
                    None
                } else if data == DONE_SENTINEL {
                    Some(Ok(SsePayload::Done))
                } else {
                    Some(Ok(SsePayload::Data(data.to_owned())))
                }
            }
            Err(EventStreamError::Transport(e)) => Some(Err(e)),
            Err(e) => Some(Err(GatewayError::Stream(e.to_string()))),
        }
    })
}

fn guarded(body: BodyStream, limits: StreamLimits) -> impl Stream<Item = Result<Bytes, GatewayError>> + Send {
    stream::unfold(Some((body, 0usize)), move |state| async move {
        let (mut body, pending) = state?;

        match tokio::time::timeout(limits.read_timeout, body.next()).await {
            Err(_) => {
                let error = GatewayError::Timeout(format!("no stream data for {}s", limits.read_timeout.as_secs()));
                Some((Err(error), None))
            }
            Ok(None) => None,
            Ok(Some(Err(e))) => Some((Err(e), None)),
            Ok(Some(Ok(bytes))) => match track_line(pending, &bytes, limits.max_line_bytes) {
                Some(pending) => Some((Ok(bytes), Some((body, pending)))),
                None => {
                    let error = GatewayError::Stream(format!("stream line exceeds {} bytes", limits.max_line_bytes));
                    Some((Err(error), None))
                }
            },
        }
    })
}

/// Length of the unterminated line after appending `bytes`
///
/// `pending` is the length of the line left open by earlier reads. Lines end
/// at `\n` or `\r`, matching SSE framing. Returns `None` as soon as any line
/// exceeds `max`.
pub fn track_line(pending: usize, bytes: &[u8], max: usize) -> Option<usize> {
    let mut current = pending;

    for (position, segment) in bytes.split(|&b| b == b'\n' || b == b'\r').enumerate() {
        current = if position == 0 {
            pending.saturating_add(segment.len())
        } else {
            segment.len()
        };

        if current > max {
            return None;
        }
    }

    Some(current)
}
