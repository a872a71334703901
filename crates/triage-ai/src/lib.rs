//! Chat-completion surface used by the issue triage runtime.
mod openai;
mod types;

pub use openai::{OpenAiAuthScheme, OpenAiClient, OpenAiConfig};
pub use types::{
    ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, MessageRole, TriageAiError,
};
