//! Single-stage entry points that bypass the full pipeline.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use leadvox_schema::{IntentDecision, IntentKind, Utterance};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub transcription: String,
    #[serde(default)]
    pub intent: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/test/classify", post(classify))
        .route("/test/extract", post(extract))
}

async fn classify(
    State(state): State<AppState>,
    Json(utterance): Json<Utterance>,
) -> Json<IntentDecision> {
    Json(state.router.classify_only(&utterance.text).await)
}

async fn extract(State(state): State<AppState>, Json(request): Json<ExtractRequest>) -> Json<Value> {
    let kind = request
        .intent
        .as_deref()
        .map(IntentKind::parse)
        .unwrap_or(IntentKind::NewLead);
    let fields = state
        .router
        .extract_only(kind, &request.transcription)
        .await;
    let body = fields
        .and_then(|fields| serde_json::to_value(fields).ok())
        .unwrap_or_else(|| json!({ "intent": IntentKind::Unknown, "raw_transcription": request.transcription }));
    Json(body)
}
