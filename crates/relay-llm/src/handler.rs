//! Axum route handlers for the OpenAI-compatible endpoints

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::{Stream, stream};
use http::{HeaderMap, HeaderValue, header};
use relay_core::HttpError;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use crate::error::GatewayError;
use crate::gateway::{ChatOptions, ChatOutcome, Relayed};
use crate::sse::{DONE_SENTINEL, RelayEvent};
use crate::state::GatewayState;
use crate::types::completion_to_chunk;

/// Build the gateway router with all endpoints
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/models", routing::get(list_models))
        .route("/v1/generation", routing::get(generation))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ChatQuery {
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    buffered: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GenerationQuery {
    #[serde(default)]
    id: Option<String>,
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(state): State<GatewayState>,
    Query(query): Query<ChatQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let options = ChatOptions {
        stream: query.stream,
        buffered: query.buffered,
    };

    match state.chat(headers, options, &body).await {
        Ok(ChatOutcome::Relayed(relayed)) => relayed_response(relayed),
        Ok(ChatOutcome::Buffered(completion)) => Json(completion).into_response(),
        Ok(ChatOutcome::Streaming { events, guard }) => Sse::new(relay_stream(events, guard))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Ok(ChatOutcome::Secondary { answer, streaming: true }) => {
            let chunk = completion_to_chunk(&answer.completion).to_string();
            let events = stream::iter([
                Ok::<_, Infallible>(Event::default().data(chunk)),
                Ok(Event::default().data(DONE_SENTINEL)),
            ]);
            Sse::new(events).into_response()
        }
        Ok(ChatOutcome::Secondary {
            answer,
            streaming: false,
        }) => ([(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))], answer.body).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle `GET /v1/models`
async fn list_models(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    match state.models(&headers).await {
        Ok(relayed) => relayed_response(relayed),
        Err(e) => error_response(e),
    }
}

/// Handle `GET /v1/generation?id=...`
async fn generation(
    State(state): State<GatewayState>,
    Query(query): Query<GenerationQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return error_response(GatewayError::InvalidRequest("missing `id` query parameter".to_owned()));
    };

    match state.generation(&headers, &id).await {
        Ok(relayed) => relayed_response(relayed),
        Err(e) => error_response(e),
    }
}

/// Forward relay events as SSE until the stream task finishes
///
/// The drop guard travels with the body, so a caller that disconnects
/// cancels the upstream call. When a retry reopens the upstream after the
/// response is committed, the new attempt is forwarded from its first event,
/// so the caller may see earlier content again.
fn relay_stream(
    events: mpsc::Receiver<RelayEvent>,
    guard: DropGuard,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    stream::unfold((events, guard, 0usize), |(mut events, guard, mut opened)| async move {
        loop {
            let event = match events.recv().await? {
                RelayEvent::Opened => {
                    opened += 1;
                    if opened > 1 {
                        tracing::warn!(attempt = opened, "upstream stream restarted after commit, replaying from its start");
                    }
                    continue;
                }
                RelayEvent::Data(data) => Event::default().data(data),
                RelayEvent::Failed(e) => {
                    tracing::warn!(error = %e, "stream failed after response was committed");
                    Event::default().data(e.error_body().to_string())
                }
            };
            return Some((Ok(event), (events, guard, opened)));
        }
    })
}

fn relayed_response(relayed: Relayed) -> Response {
    let mut response = Response::new(Body::from(relayed.body));
    *response.status_mut() = relayed.status;
    if let Some(content_type) = relayed.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// Convert a gateway error to an `OpenAI`-style JSON error response
///
/// Upstream errors keep the provider's status and body.
fn error_response(error: GatewayError) -> Response {
    match error {
        GatewayError::Upstream { status, body } => {
            let mut response = Response::new(Body::from(body.clone()));
            *response.status_mut() = status;
            if serde_json::from_slice::<serde_json::Value>(&body).is_ok() {
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            response
        }
        other => {
            if matches!(other, GatewayError::Internal(_)) {
                tracing::error!(error = %other, "request failed");
            }
            (other.status_code(), Json(other.error_body())).into_response()
        }
    }
}
