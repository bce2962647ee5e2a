use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::frontend::recorder_handler;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub target: &'static str,
    pub recorder: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/recorder", get(recorder_handler))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "leadvox",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        target: "EF San Juan CRM",
        recorder: format!("{}/recorder", state.public_url),
    })
}
