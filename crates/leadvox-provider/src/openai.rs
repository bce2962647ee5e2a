use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    format_api_error, http_client, send_error, LlmMessage, LlmProvider, LlmRequest, LlmResponse,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

impl OpenAiProvider {
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
            messages: to_api_messages(request.system, request.messages),
            max_tokens: Some(request.max_tokens),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = Self::to_api_request(request);

        let resp = self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("openai", self.timeout, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            let parsed = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .ok()
                .map(|e| (e.error.message, e.error.r#type));
            return Err(format_api_error("openai", status, parsed));
        }

        let body: ApiResponse = resp.json().await?;
        to_llm_response(body)
    }
}

fn to_api_messages(system: Option<String>, messages: Vec<LlmMessage>) -> Vec<ApiMessage> {
    system
        .map(|content| ApiMessage {
            role: "system".to_string(),
            content: Some(content),
        })
        .into_iter()
        .chain(messages.into_iter().map(|m| ApiMessage {
            role: m.role,
            content: Some(m.content),
        }))
        .collect()
}

fn to_llm_response(body: ApiResponse) -> Result<LlmResponse> {
    let choice = body
        .choices
        .first()
        .ok_or_else(|| anyhow!("openai api error: empty choices"))?;

    Ok(LlmResponse {
        text: choice.message.content.clone().unwrap_or_default(),
        input_tokens: body.usage.as_ref().map(|u| u.prompt_tokens),
        output_tokens: body.usage.as_ref().map(|u| u.completion_tokens),
        stop_reason: normalize_finish_reason(choice.finish_reason.clone()),
    })
}

fn normalize_finish_reason(reason: Option<String>) -> Option<String> {
    match reason.as_deref() {
        Some("stop") => Some("end_turn".to_string()),
        Some("length") => Some("max_tokens".to_string()),
        _ => reason,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiResponse {
    pub choices: Vec<ApiChoice>,
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiMessageContent,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiMessageContent {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    pub r#type: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_openai_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": {"content": text},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        })
    }

    #[test]
    fn system_prompt_becomes_first_message() {
        let req = LlmRequest {
            model: "gpt-4o".into(),
            system: Some("be terse".into()),
            messages: vec![LlmMessage::user("hi")],
            max_tokens: 64,
        };
        let value = serde_json::to_value(OpenAiProvider::to_api_request(req)).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 64);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let body = ApiResponse {
            choices: vec![],
            usage: None,
        };
        assert!(to_llm_response(body).is_err());
    }

    #[tokio::test]
    async fn chat_with_header_verification() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_openai_response("{\"intent\":\"task\"}")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", server.uri());
        let resp = provider
            .chat(LlmRequest::simple("gpt-4o", "remind me tomorrow", 128))
            .await
            .unwrap();

        assert_eq!(resp.text, "{\"intent\":\"task\"}");
        assert_eq!(resp.input_tokens, Some(10));
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
    }

    #[tokio::test]
    async fn chat_maps_rate_limit_to_retryable_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit", "message": "slow down"}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", server.uri());
        let err = provider
            .chat(LlmRequest::simple("gpt-4o", "hi", 16))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("slow down"));
        assert!(text.contains("[retryable]"));
    }
}
