use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "../../web"]
struct Assets;

const RECORDER_PAGE: &str = "recorder.html";

pub async fn recorder_handler() -> Response {
    match Assets::get(RECORDER_PAGE) {
        Some(content) => {
            let mime = mime_guess::from_path(RECORDER_PAGE).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=60".to_string()),
                ],
                content.data.into_response(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>Recorder page missing</h1><p>Expected <code>web/recorder.html</code> at build time.</p>"),
        )
            .into_response(),
    }
}
