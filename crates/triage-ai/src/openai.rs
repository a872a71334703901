use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, TriageAiError};

const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";
const ERROR_BODY_MAX_CHARS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Enumerates supported `OpenAiAuthScheme` values.
pub enum OpenAiAuthScheme {
    /// `api-key: <key>`, the Azure OpenAI convention.
    #[default]
    ApiKeyHeader,
    Bearer,
}

#[derive(Debug, Clone)]
/// Public struct `OpenAiConfig` used to build an [`OpenAiClient`].
pub struct OpenAiConfig {
    pub api_url: String,
    pub api_key: String,
    pub auth_scheme: OpenAiAuthScheme,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// OpenAI-compatible chat-completions client. One request per call, no retries.
pub struct OpenAiClient {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, TriageAiError> {
        if config.api_key.trim().is_empty() {
            return Err(TriageAiError::MissingApiKey);
        }
        let url = resolve_chat_completions_url(&config.api_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match config.auth_scheme {
            OpenAiAuthScheme::Bearer => {
                let bearer = format!("Bearer {}", config.api_key.trim());
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&bearer).map_err(|e| {
                        TriageAiError::InvalidEndpoint(format!("invalid API key header: {e}"))
                    })?,
                );
            }
            OpenAiAuthScheme::ApiKeyHeader => {
                headers.insert(
                    "api-key",
                    HeaderValue::from_str(config.api_key.trim()).map_err(|e| {
                        TriageAiError::InvalidEndpoint(format!("invalid API key header: {e}"))
                    })?,
                );
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, url })
    }

    pub fn chat_completions_url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, TriageAiError> {
        let body = build_chat_request_body(&request);
        tracing::debug!(
            url = self.url.as_str(),
            messages = request.messages.len(),
            json_mode = request.json_mode,
            "sending chat completion request"
        );

        let response = self.client.post(self.url.clone()).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(http_status_error(status.as_u16(), &raw));
        }
        parse_chat_response(&raw)
    }
}

fn http_status_error(status: u16, raw: &str) -> TriageAiError {
    let body = if raw.chars().count() <= ERROR_BODY_MAX_CHARS {
        raw.to_string()
    } else {
        let mut truncated = raw.chars().take(ERROR_BODY_MAX_CHARS).collect::<String>();
        truncated.push_str("...");
        truncated
    };
    TriageAiError::HttpStatus { status, body }
}

fn resolve_chat_completions_url(api_url: &str) -> Result<reqwest::Url, TriageAiError> {
    let trimmed = api_url.trim();
    if trimmed.is_empty() {
        return Err(TriageAiError::InvalidEndpoint(
            "endpoint URL is empty".to_string(),
        ));
    }
    let mut url = reqwest::Url::parse(trimmed)
        .map_err(|e| TriageAiError::InvalidEndpoint(format!("invalid endpoint URL: {e}")))?;
    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(CHAT_COMPLETIONS_SUFFIX) {
        url.set_path(&format!("{path}{CHAT_COMPLETIONS_SUFFIX}"));
    }
    Ok(url)
}

fn build_chat_request_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content,
            })
        })
        .collect();
    let mut body = json!({ "messages": messages });

    if let Some(model) = request.model.as_deref() {
        body["model"] = json!(model);
    }
    if request.json_mode {
        body["response_format"] = json!({
            "type": "json_object",
        });
    }
    body
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

fn parse_chat_response(raw: &str) -> Result<ChatResponse, TriageAiError> {
    let parsed: OpenAiChatResponse = serde_json::from_str(raw)?;
    let choice =
        parsed.choices.into_iter().next().ok_or_else(|| {
            TriageAiError::InvalidResponse("response contained no choices".to_string())
        })?;
    let text = choice
        .message
        .and_then(|message| message.content)
        .map(|content| flatten_content(&content))
        .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(TriageAiError::InvalidResponse(
            "response is missing message content".to_string(),
        ));
    }

    let usage = parsed
        .usage
        .map(|usage| ChatUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        message: Message::assistant_text(text),
        finish_reason: choice.finish_reason,
        usage,
    })
}

fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| {
                let object = part.as_object()?;
                if object.get("type").and_then(Value::as_str) != Some("text") {
                    return None;
                }
                object.get("text").and_then(Value::as_str)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        build_chat_request_body, http_status_error, parse_chat_response,
        resolve_chat_completions_url, OpenAiAuthScheme, OpenAiClient, OpenAiConfig,
        ERROR_BODY_MAX_CHARS,
    };
    use crate::{ChatRequest, Message, TriageAiError};

    #[test]
    fn unit_resolve_url_appends_chat_completions_suffix_once() {
        let appended = resolve_chat_completions_url("https://example.test/openai/v1/")
            .expect("resolve appended url");
        assert_eq!(
            appended.as_str(),
            "https://example.test/openai/v1/chat/completions"
        );

        let kept = resolve_chat_completions_url("https://example.test/v1/chat/completions")
            .expect("resolve full url");
        assert_eq!(kept.as_str(), "https://example.test/v1/chat/completions");
    }

    #[test]
    fn functional_resolve_url_preserves_api_version_query() {
        let url = resolve_chat_completions_url(
            "https://example.test/openai/deployments/d1?api-version=2024-10-21",
        )
        .expect("resolve azure url");
        assert_eq!(
            url.as_str(),
            "https://example.test/openai/deployments/d1/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn regression_resolve_url_rejects_blank_and_relative_urls() {
        assert!(matches!(
            resolve_chat_completions_url("   "),
            Err(TriageAiError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            resolve_chat_completions_url("not a url"),
            Err(TriageAiError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn unit_client_rejects_blank_api_key() {
        let error = OpenAiClient::new(OpenAiConfig {
            api_url: "https://example.test".to_string(),
            api_key: "  ".to_string(),
            auth_scheme: OpenAiAuthScheme::ApiKeyHeader,
            request_timeout_ms: 1_000,
        })
        .expect_err("blank key must fail");
        assert!(matches!(error, TriageAiError::MissingApiKey));
    }

    #[test]
    fn functional_request_body_sets_json_mode_and_omits_unset_model() {
        let body = build_chat_request_body(&ChatRequest {
            model: None,
            messages: vec![Message::system("sys"), Message::user("hello")],
            json_mode: true,
        });
        assert_eq!(
            body,
            json!({
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ],
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn unit_request_body_includes_model_when_configured() {
        let body = build_chat_request_body(&ChatRequest {
            model: Some("gpt-4o-mini".to_string()),
            messages: vec![Message::user("hi")],
            ..ChatRequest::default()
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn functional_parse_chat_response_trims_content_and_reads_usage() {
        let parsed = parse_chat_response(
            &json!({
                "choices": [{"message": {"content": "  {\"response\":\"ok\"}\n"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
            })
            .to_string(),
        )
        .expect("parse response");
        assert_eq!(parsed.message.text_content(), "{\"response\":\"ok\"}");
        assert_eq!(parsed.finish_reason.as_deref(), Some("stop"));
        assert_eq!(parsed.usage.total_tokens, 8);
    }

    #[test]
    fn unit_parse_chat_response_joins_text_parts() {
        let parsed = parse_chat_response(
            &json!({
                "choices": [{"message": {"content": [
                    {"type": "text", "text": "first"},
                    {"type": "image_url", "image_url": {"url": "https://example.test/a.png"}},
                    {"type": "text", "text": "second"}
                ]}}]
            })
            .to_string(),
        )
        .expect("parse parts");
        assert_eq!(parsed.message.text_content(), "first\nsecond");
    }

    #[test]
    fn regression_parse_chat_response_rejects_missing_or_blank_content() {
        for raw in [
            json!({"choices": []}),
            json!({"choices": [{"message": {}}]}),
            json!({"choices": [{"message": {"content": null}}]}),
            json!({"choices": [{"message": {"content": "   "}}]}),
            json!({"choices": [{}]}),
        ] {
            let error = parse_chat_response(&raw.to_string()).expect_err("envelope must fail");
            assert!(
                matches!(error, TriageAiError::InvalidResponse(_)),
                "unexpected error for {raw}: {error}"
            );
        }
    }

    #[test]
    fn regression_parse_chat_response_surfaces_malformed_envelope_as_serde_error() {
        let error = parse_chat_response("<html>gateway</html>").expect_err("not json");
        assert!(matches!(error, TriageAiError::Serde(_)));
    }

    #[test]
    fn regression_http_status_error_body_is_bounded() {
        let short = http_status_error(502, "bad gateway");
        assert!(matches!(
            short,
            TriageAiError::HttpStatus { status: 502, ref body } if body == "bad gateway"
        ));

        let page = "é".repeat(5_000);
        let TriageAiError::HttpStatus { status, body } = http_status_error(500, &page) else {
            panic!("expected status error");
        };
        assert_eq!(status, 500);
        assert!(body.ends_with("..."));
        assert_eq!(body.chars().count(), ERROR_BODY_MAX_CHARS + 3);
    }
}
