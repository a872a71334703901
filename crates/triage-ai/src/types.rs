use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One role-tagged entry of a conversation.
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }

    pub fn text_content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Public struct `ChatRequest` sent to a chat-completion endpoint.
pub struct ChatRequest {
    /// Deployment-scoped endpoints (Azure) select the model from the URL, so
    /// the field is omitted from the wire body when unset.
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub json_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Public struct `ChatUsage` reported by the endpoint.
pub struct ChatUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `ChatResponse` holding the single assistant message.
pub struct ChatResponse {
    pub message: Message,
    pub finish_reason: Option<String>,
    pub usage: ChatUsage,
}

#[derive(Debug, Error)]
/// Enumerates supported `TriageAiError` values.
pub enum TriageAiError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("invalid endpoint configuration: {0}")]
    InvalidEndpoint(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
/// Trait contract for `LlmClient` behavior.
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, TriageAiError>;
}

#[cfg(test)]
mod tests {
    use super::{Message, MessageRole, TriageAiError};

    #[test]
    fn unit_message_constructors_tag_roles() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant_text("a").role, MessageRole::Assistant);
        assert_eq!(Message::user("hello").text_content(), "hello");
    }

    #[test]
    fn unit_message_role_wire_names() {
        assert_eq!(MessageRole::System.as_str(), "system");
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn regression_http_status_error_renders_status_and_body() {
        let error = TriageAiError::HttpStatus {
            status: 500,
            body: "upstream exploded".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "provider returned non-success status 500: upstream exploded"
        );
    }
}
