use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound chat-completion request
///
/// `model` and `messages` are interpreted; all other fields are forwarded
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Requested model identifier, possibly a secondary-provider alias
    pub model: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Passthrough fields (`temperature`, `stream`, `tools`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    /// Whether the body asks for a streamed response
    pub fn is_stream(&self) -> bool {
        self.extra.get("stream").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Force the `stream` flag sent upstream
    pub fn set_stream(&mut self, stream: bool) {
        self.extra.insert("stream".to_owned(), Value::Bool(stream));
    }
}

/// One conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Plain string or an array of content parts
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
