use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/chat", post(handlers::chat_handler))
        .route(
            "/chat/upload",
            post(handlers::upload_handler).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route(
            "/sessions/{session_id}/history",
            get(handlers::history_handler),
        )
        .route("/catalog", get(handlers::catalog_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
