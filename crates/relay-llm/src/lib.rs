//! Chat-completion gateway core
//!
//! Forwards OpenAI-compatible chat requests to a primary provider with
//! bounded retries, optionally probing a secondary provider first for
//! aliased models. Streamed responses are relayed to the caller while being
//! folded into one completion that is recorded to disk.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod backoff;
pub mod error;
pub mod fallback;
mod gateway;
mod handler;
pub mod history;
pub mod reassemble;
pub mod retry;
pub mod sse;
mod state;
pub mod types;
pub mod upstream;

pub use backoff::Backoff;
pub use error::GatewayError;
pub use handler::gateway_router;
pub use history::{FileHistory, HistoryKind, HistoryRecord, HistorySink};
pub use reassemble::Reassembler;
pub use retry::{Attempt, RetryController};
pub use state::GatewayState;
pub use upstream::{Upstream, UpstreamRequest, UpstreamResponse};
