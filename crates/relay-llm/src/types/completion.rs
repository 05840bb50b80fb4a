use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Object type of a complete, non-streamed response
pub const COMPLETION_OBJECT: &str = "chat.completion";

/// Object type of one streamed delta
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Completion folded from a chunk stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Accumulated state of one choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub index: usize,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    /// Provider-specific accounting such as cost
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rewrite a complete response as a single stream chunk
///
/// Each choice's `message` becomes its `delta`. Used to answer streaming
/// callers from a provider that only speaks non-streaming JSON.
pub fn completion_to_chunk(completion: &Value) -> Value {
    let choices: Vec<Value> = completion
        .get("choices")
        .and_then(Value::as_array)
        .map(|choices| {
            choices
                .iter()
                .enumerate()
                .map(|(position, choice)| {
                    json!({
                        "index": choice.get("index").cloned().unwrap_or_else(|| json!(position)),
                        "delta": choice.get("message").cloned().unwrap_or_else(|| json!({})),
                        "finish_reason": choice.get("finish_reason").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut chunk = json!({
        "id": completion.get("id").cloned().unwrap_or(Value::Null),
        "object": CHUNK_OBJECT,
        "created": completion.get("created").cloned().unwrap_or(Value::Null),
        "model": completion.get("model").cloned().unwrap_or(Value::Null),
        "choices": choices,
    });

    if let Some(usage) = completion.get("usage")
        && let Some(object) = chunk.as_object_mut()
    {
        object.insert("usage".to_owned(), usage.clone());
    }

    chunk
}
