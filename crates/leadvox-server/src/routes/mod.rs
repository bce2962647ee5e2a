pub mod diagnostics;
pub mod health;
pub mod voice;

use axum::Router;

use crate::state::AppState;

pub fn app_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(voice::router())
        .merge(diagnostics::router())
}
