#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod headers;
pub mod health;
pub mod history;
mod loader;
pub mod retry;
pub mod server;
pub mod streaming;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use cors::*;
pub use headers::*;
pub use health::*;
pub use history::*;
pub use retry::*;
pub use server::*;
pub use streaming::*;
pub use telemetry::*;
pub use upstream::*;

/// Top-level gateway configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream provider configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Retry and backoff policy for primary-provider calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Streaming response handling
    #[serde(default)]
    pub streaming: StreamingConfig,
    /// Request/response history persistence
    #[serde(default)]
    pub history: HistoryConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// Parse a human-readable duration such as `"500ms"` or `"15s"`
///
/// # Errors
///
/// Returns an error naming the offending field when the string is not a
/// valid duration
pub fn parse_duration(field: &str, value: &str) -> anyhow::Result<std::time::Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}
