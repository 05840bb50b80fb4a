use std::time::Duration;

use serde::Deserialize;

use crate::parse_duration;

/// How streamed completions are delivered to callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Forward each upstream event as it arrives, accumulating on the side
    #[default]
    PassThrough,
    /// Drain the upstream stream, then answer with one synthesized completion
    Buffered,
}

/// Streaming response handling
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Default delivery mode, overridable per request with `?buffered=`
    #[serde(default)]
    pub mode: StreamMode,
    /// Upstream inactivity allowed before an attempt is abandoned
    #[serde(default = "default_read_timeout")]
    pub read_timeout: String,
    /// Longest SSE line accepted from the upstream
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mode: StreamMode::default(),
            read_timeout: default_read_timeout(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl StreamingConfig {
    /// Parsed read timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `read_timeout` is not a valid duration
    pub fn read_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration("streaming.read_timeout", &self.read_timeout)
    }
}

fn default_read_timeout() -> String {
    "15s".to_owned()
}

const fn default_max_line_bytes() -> usize {
    1 << 20
}
