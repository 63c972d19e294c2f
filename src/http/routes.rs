use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Preview surfaces
        .route(
            "/previews/:preview_id",
            post(handlers::register_preview).delete(handlers::unregister_preview),
        )
        // Camera + recording control
        .route("/camera/enable", post(handlers::enable_camera))
        .route("/camera/disable", post(handlers::disable_camera))
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/pause", post(handlers::pause_recording))
        .route("/recording/resume", post(handlers::resume_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/status", get(handlers::recording_status))
        .route("/recording/supported", get(handlers::is_type_supported))
        // Host notifications
        .route("/events", get(handlers::events))
        // Recorded artifacts
        .route(
            "/artifacts/:artifact_id",
            get(handlers::get_artifact).delete(handlers::revoke_artifact),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
