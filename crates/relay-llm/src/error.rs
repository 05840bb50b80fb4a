use bytes::Bytes;
use http::StatusCode;
use relay_core::HttpError;
use thiserror::Error;

/// Errors that can occur while serving a chat request
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection to the provider could not be established or was reset
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Provider did not respond, or went silent mid-stream
    #[error("upstream timed out: {0}")]
    Timeout(String),

    /// Event stream broke before its natural end
    #[error("upstream stream error: {0}")]
    Stream(String),

    /// Provider answered with a non-OK status
    #[error("upstream returned {status}")]
    Upstream {
        /// Status returned by the provider
        status: StatusCode,
        /// Raw body returned by the provider
        body: Bytes,
    },

    /// Stream ended without a single decodable chunk
    #[error("upstream stream produced no completion chunks")]
    EmptyCompletion,

    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts performed
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },

    /// Caller disconnected before the response completed
    #[error("caller disconnected")]
    Cancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Whether another attempt against the same provider may succeed
    ///
    /// Only transport-level failures qualify. A provider that answered with
    /// an error status has made its decision and is not asked again.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_) | Self::Stream(_))
    }
}

impl HttpError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Transport(_) | Self::Stream(_) | Self::EmptyCompletion | Self::RetriesExhausted { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } => *status,
            // nginx's "client closed request"; nobody is left to read it
            Self::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Transport(_) | Self::Stream(_) | Self::EmptyCompletion => "upstream_error",
            Self::Timeout(_) => "timeout_error",
            Self::Upstream { .. } => "upstream_status_error",
            Self::RetriesExhausted { .. } => "retries_exhausted_error",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
