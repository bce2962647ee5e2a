use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{format_api_error, http_client, send_error};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_FILE_NAME: &str = "recording.webm";

/// Raw audio as uploaded by a client.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl AudioClip {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

/// Speech-to-text engine: audio in, plain text out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String>;
}

/// Whisper through the OpenAI audio transcription endpoint.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl WhisperTranscriber {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: "whisper-1".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }

    fn build_form(&self, clip: AudioClip) -> Result<Form> {
        let file_name = clip
            .file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        let mut part = Part::bytes(clip.bytes.to_vec()).file_name(file_name);
        if let Some(mime) = clip.mime_type.as_deref() {
            part = part.mime_str(mime)?;
        }
        Ok(Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String> {
        if clip.bytes.is_empty() {
            bail!("audio payload is empty");
        }
        let size = clip.bytes.len();
        let form = self.build_form(clip)?;
        let url = format!("{}/audio/transcriptions", self.api_base);

        let resp = self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_error("whisper", self.timeout, e))?;

        let status = resp.status();
        let text = resp.text().await?;
        if status != StatusCode::OK {
            let parsed = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .ok()
                .map(|e| (e.error.message, e.error.r#type));
            return Err(format_api_error("whisper", status, parsed));
        }

        let transcript = text.trim().to_string();
        tracing::info!(
            audio_bytes = size,
            chars = transcript.chars().count(),
            "transcribed audio"
        );
        Ok(transcript)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    r#type: String,
    message: String,
}
