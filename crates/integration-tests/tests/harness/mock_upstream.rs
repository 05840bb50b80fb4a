//! Scripted upstream provider for integration tests
//!
//! Every request, whatever its path, takes the next reply from the script.
//! The last reply repeats once the script runs out.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply {
    /// SSE `data:` events followed by a clean end of body
    Stream(Vec<String>),
    /// SSE events, then the connection is aborted
    StreamThenReset(Vec<String>),
    /// SSE events, then nothing until the caller gives up
    StreamThenStall(Vec<String>),
    /// Fixed status with a JSON body
    Json(StatusCode, Value),
}

/// Request as seen by the mock
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("captured body is JSON")
    }
}

struct MockState {
    script: Mutex<VecDeque<Reply>>,
    captured: Mutex<Vec<Captured>>,
}

pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start(script: impl IntoIterator<Item = Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            script: Mutex::new(script.into_iter().collect()),
            captured: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// API root, as configured for the primary provider
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Full chat-completions endpoint, as configured for the secondary provider
    pub fn chat_url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.state.captured.lock().unwrap().len()
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.state.captured.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.captured.lock().unwrap().push(Captured {
        method,
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body,
    });

    let reply = {
        let mut script = state.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };

    match reply {
        Some(Reply::Stream(events)) => sse_response(Body::from_stream(events_stream(events))),
        Some(Reply::StreamThenReset(events)) => {
            let reset = stream::once(async {
                // let the events reach the caller before the abort
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Err(std::io::Error::other("connection reset by mock"))
            });
            sse_response(Body::from_stream(events_stream(events).chain(reset)))
        }
        Some(Reply::StreamThenStall(events)) => {
            sse_response(Body::from_stream(events_stream(events).chain(stream::pending())))
        }
        Some(Reply::Json(status, body)) => (status, axum::Json(body)).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "script exhausted").into_response(),
    }
}

fn events_stream(events: Vec<String>) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send {
    stream::iter(events).then(|event| async move {
        // separate writes so the caller sees events one at a time
        tokio::task::yield_now().await;
        Ok(Bytes::from(format!("data: {event}\n\n")))
    })
}

fn sse_response(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// One `chat.completion.chunk` payload for choice 0
pub fn chunk(content: &str, finish_reason: Option<&str>) -> String {
    serde_json::json!({
        "id": "gen-1",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "generic-model",
        "choices": [{
            "index": 0,
            "delta": {"role": "assistant", "content": content},
            "finish_reason": finish_reason,
        }]
    })
    .to_string()
}

/// `Hi` + ` there`, finished, then `[DONE]`
pub fn hi_there() -> Vec<String> {
    vec![chunk("Hi", None), chunk(" there", Some("stop")), "[DONE]".to_owned()]
}

/// Complete non-streaming response with one assistant message
pub fn completion(content: &str) -> Value {
    serde_json::json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "native-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
        }]
    })
}

