use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{format_api_error, http_client, send_error, LlmProvider, LlmRequest, LlmResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }

    pub(crate) fn to_api_request(request: LlmRequest) -> ApiRequest {
        ApiRequest {
            model: request.model,
            system: request.system,
            max_tokens: request.max_tokens,
            messages: request
                .messages
                .into_iter()
                .map(|m| ApiMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", self.api_base);
        let payload = Self::to_api_request(request);

        let resp = self
            .client
            .post(url)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("anthropic", self.timeout, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            let parsed = serde_json::from_str::<ApiError>(&text)
                .ok()
                .map(|e| (e.error.message, e.error.r#type));
            return Err(format_api_error("anthropic", status, parsed));
        }

        let body: ApiResponse = resp.json().await?;
        let text = body
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(LlmResponse {
            text,
            input_tokens: body.usage.as_ref().map(|u| u.input_tokens),
            output_tokens: body.usage.as_ref().map(|u| u.output_tokens),
            stop_reason: body.stop_reason,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    pub messages: Vec<ApiMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiResponse {
    pub content: Vec<ApiContentBlock>,
    pub usage: Option<ApiUsage>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub r#type: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn anthropic_new_trims_trailing_slash() {
        let provider = AnthropicProvider::new("test-key", "https://api.anthropic.com/");

        assert_eq!(provider.api_key, "test-key");
        assert_eq!(provider.api_base, "https://api.anthropic.com");
    }

    #[test]
    fn api_request_serialization_matches_expected_shape() {
        let req = LlmRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            system: None,
            messages: vec![LlmMessage::user("classify this")],
            max_tokens: 200,
        };
        let value = serde_json::to_value(AnthropicProvider::to_api_request(req)).unwrap();
        let expected = serde_json::json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 200,
            "messages": [
                { "role": "user", "content": "classify this" }
            ]
        });

        assert_eq!(value, expected);
    }

    #[test]
    fn api_response_deserialization_ignores_non_text_blocks() {
        let raw = serde_json::json!({
            "content": [
                {"type": "text", "text": "line 1"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 34},
            "stop_reason": "end_turn"
        });

        let parsed: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert_eq!(parsed.content[0].text.as_deref(), Some("line 1"));
        assert!(parsed.content[1].text.is_none());
    }

    #[tokio::test]
    async fn chat_sends_headers_and_joins_text_blocks() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({"max_tokens": 200})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "{\"intent\": \"new_lead\","},
                    {"type": "text", "text": "\"confidence\": 0.9}"}
                ],
                "usage": {"input_tokens": 40, "output_tokens": 12},
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let resp = provider
            .chat(LlmRequest::simple("claude-sonnet-4-20250514", "hi", 200))
            .await
            .unwrap();

        assert_eq!(resp.text, "{\"intent\": \"new_lead\",\n\"confidence\": 0.9}");
        assert_eq!(resp.input_tokens, Some(40));
        assert_eq!(resp.output_tokens, Some(12));
    }

    #[tokio::test]
    async fn chat_surfaces_api_error_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let err = provider
            .chat(LlmRequest::simple("m", "hi", 10))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("529"));
        assert!(text.contains("Overloaded"));
        assert!(text.contains("[retryable]"));
    }

    #[tokio::test]
    #[ignore]
    async fn integration_real_api_call() {
        let api_key = match std::env::var("ANTHROPIC_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => api_key,
            _ => return,
        };
        let provider = AnthropicProvider::new(api_key, "https://api.anthropic.com");

        let response = provider
            .chat(LlmRequest::simple(
                "claude-3-5-haiku-latest",
                "Reply with exactly: pong",
                20,
            ))
            .await
            .unwrap();
        assert!(!response.text.trim().is_empty());
    }
}
