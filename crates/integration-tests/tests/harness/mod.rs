#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

pub mod config;
pub mod mock_upstream;
pub mod server;

/// `data:` payloads of an SSE body, in order
pub fn sse_payloads(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.trim_start().to_owned())
        .collect()
}

/// Concatenated `delta.content` of every chunk payload
pub fn streamed_content(payloads: &[String]) -> String {
    payloads
        .iter()
        .filter_map(|payload| serde_json::from_str::<serde_json::Value>(payload).ok())
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str().map(str::to_owned))
        .collect()
}

/// Chat request body with a single user message
pub fn chat_body(model: &str, stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "Hello"}],
        "stream": stream,
    })
}
