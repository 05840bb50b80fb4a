//! Wire types for OpenAI-compatible chat completions
//!
//! Only the fields the gateway interprets are typed; everything else rides
//! along in flattened maps so requests and responses keep their shape.

pub mod chunk;
pub mod completion;
pub mod request;

pub use chunk::{ChunkChoice, ChunkDelta, StreamChunk};
pub use completion::{AssistantMessage, ChatCompletion, CompletionChoice, Usage, completion_to_chunk};
pub use request::{ChatMessage, ChatRequest};
