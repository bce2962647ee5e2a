use std::sync::Arc;

use leadvox_core::IntentRouter;
use leadvox_provider::Transcriber;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<IntentRouter>,
    /// Unset when no transcription key is configured; audio routes then fail
    pub transcriber: Option<Arc<dyn Transcriber>>,
    /// Externally reachable base URL, without a trailing slash
    pub public_url: String,
}

impl AppState {
    pub fn new(router: Arc<IntentRouter>, public_url: impl Into<String>) -> Self {
        Self {
            router,
            transcriber: None,
            public_url: public_url.into(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }
}
