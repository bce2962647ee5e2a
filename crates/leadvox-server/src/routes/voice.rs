use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use leadvox_provider::AudioClip;
use leadvox_schema::{
    ActionResult, ExtractedFields, IntentDecision, IntentKind, ProcessOutcome, Utterance,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Whisper rejects uploads above 25 MB.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[derive(Serialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub intent: IntentKind,
    pub confidence: f64,
    pub transcription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<Value>,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub transcription: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub extracted_fields: Value,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/wispr", post(wispr_webhook))
        .route("/api/confirm-lead", post(confirm_lead))
        .merge(
            Router::new()
                .route("/api/voice-to-lead", post(voice_to_lead))
                .route("/api/transcribe", post(transcribe_only))
                .route("/api/preview-lead", post(preview_lead))
                .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
}

async fn wispr_webhook(
    State(state): State<AppState>,
    Json(utterance): Json<Utterance>,
) -> Json<ProcessOutcome> {
    tracing::info!("received transcription: {}", utterance.preview());
    Json(state.router.process(&utterance).await)
}

async fn voice_to_lead(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessOutcome>, ApiError> {
    let transcription = transcribe(&state, multipart).await?;
    let outcome = state
        .router
        .process(&Utterance::new(transcription.clone()))
        .await;
    Ok(Json(outcome.with_transcription(transcription)))
}

async fn transcribe_only(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let transcription = transcribe(&state, multipart).await?;
    Ok(Json(TranscriptionResponse { transcription }))
}

async fn preview_lead(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let transcription = transcribe(&state, multipart).await?;
    let preview = state.router.preview(&transcription).await;

    let response = match preview.fields {
        Some(fields) => PreviewResponse {
            success: true,
            intent: preview.decision.kind,
            confidence: preview.decision.confidence,
            transcription,
            extracted_fields: Some(fields.display_view()),
            message: format!(
                "Ready to apply {}. Review and confirm.",
                preview.decision.kind
            ),
        },
        None => PreviewResponse {
            success: false,
            intent: preview.decision.kind,
            confidence: preview.decision.confidence,
            transcription,
            extracted_fields: None,
            message: "Didn't sound like a CRM update. Try saying the customer name, phone and project details.".to_string(),
        },
    };
    Ok(Json(response))
}

async fn confirm_lead(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Json<ProcessOutcome> {
    let kind = request
        .intent
        .as_deref()
        .map(IntentKind::parse)
        .unwrap_or(IntentKind::NewLead);

    match ExtractedFields::from_client(kind, request.extracted_fields, &request.transcription) {
        Some(fields) => Json(state.router.confirm(fields).await),
        None => {
            let decision = IntentDecision::unknown("unrecognized intent in confirmation");
            let result = ActionResult::skipped(format!(
                "Cannot confirm intent '{}'",
                request.intent.as_deref().unwrap_or_default()
            ));
            Json(ProcessOutcome::from_action(&decision, result, None))
        }
    }
}

async fn transcribe(state: &AppState, multipart: Multipart) -> Result<String, ApiError> {
    let Some(transcriber) = state.transcriber.as_ref() else {
        return Err(ApiError::transcription("transcription service is not configured"));
    };
    let clip = read_audio(multipart).await?;
    tracing::info!(
        file = clip.file_name.as_deref().unwrap_or("-"),
        mime = clip.mime_type.as_deref().unwrap_or("-"),
        bytes = clip.bytes.len(),
        "received audio"
    );
    let text = transcriber
        .transcribe(clip)
        .await
        .map_err(ApiError::transcription)?;
    tracing::info!("transcribed audio: {}", leadvox_schema::truncate_chars(&text, 100));
    Ok(text)
}

async fn read_audio(mut multipart: Multipart) -> Result<AudioClip, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read audio: {e}")))?;

        let mut clip = AudioClip::new(bytes);
        if let Some(name) = file_name {
            clip = clip.with_file_name(name);
        }
        if let Some(mime) = mime_type {
            clip = clip.with_mime_type(mime);
        }
        return Ok(clip);
    }
    Err(ApiError::bad_request("missing 'audio' file field"))
}
