use super::state::AppState;
use crate::error::BridgeError;
use crate::media::RecorderOptions;
use crate::session::{BridgeStatus, SessionStats};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnableCameraRequest {
    /// Preview surface that will show the live source
    pub preview_id: String,

    /// Passed through to the recorder
    #[serde(default)]
    pub options: RecorderOptions,
}

#[derive(Debug, Serialize)]
pub struct EnableCameraResponse {
    pub session_id: Uuid,
    pub status: BridgeStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: BridgeStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: BridgeStatus,
    pub session: Option<SessionStats>,
}

#[derive(Debug, Deserialize)]
pub struct SupportedQuery {
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct SupportedResponse {
    pub mime_type: String,
    pub supported: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(err: BridgeError) -> Response {
    let status = match &err {
        BridgeError::NotEnabled
        | BridgeError::InvalidState { .. }
        | BridgeError::SourceInUse => StatusCode::CONFLICT,
        BridgeError::PermissionDenied => StatusCode::FORBIDDEN,
        BridgeError::NoDevice => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::PreviewNotFound(_) | BridgeError::ArtifactNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        BridgeError::UnsupportedMimeType(_) => StatusCode::BAD_REQUEST,
        BridgeError::RecorderClosed => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
        }),
    )
        .into_response()
}

fn control_response(state: &AppState, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(ControlResponse {
            status: state.bridge.status(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /previews/:preview_id
/// Register a preview surface
pub async fn register_preview(
    State(state): State<AppState>,
    Path(preview_id): Path<String>,
) -> impl IntoResponse {
    if state.bridge.previews().register(preview_id.clone()) {
        (StatusCode::CREATED, format!("Preview {} registered", preview_id))
    } else {
        (StatusCode::OK, format!("Preview {} already registered", preview_id))
    }
}

/// DELETE /previews/:preview_id
pub async fn unregister_preview(
    State(state): State<AppState>,
    Path(preview_id): Path<String>,
) -> Response {
    if state.bridge.previews().unregister(&preview_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(BridgeError::PreviewNotFound(preview_id))
    }
}

/// POST /camera/enable
/// Acquire camera + microphone and prepare a recorder
pub async fn enable_camera(
    State(state): State<AppState>,
    Json(req): Json<EnableCameraRequest>,
) -> Response {
    info!("Enabling camera on preview: {}", req.preview_id);

    match state.bridge.enable_camera(&req.preview_id, req.options).await {
        Ok(session_id) => (
            StatusCode::OK,
            Json(EnableCameraResponse {
                session_id,
                status: state.bridge.status(),
                message: format!("Camera enabled on preview {}", req.preview_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to enable camera: {}", e);
            error_response(e)
        }
    }
}

/// POST /camera/disable
pub async fn disable_camera(State(state): State<AppState>) -> Response {
    if state.bridge.disable_camera().await {
        control_response(&state, "Camera disabled")
    } else {
        error_response(BridgeError::NotEnabled)
    }
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> Response {
    match state.bridge.start_recording() {
        Ok(()) => control_response(&state, "Recording started"),
        Err(e) => error_response(e),
    }
}

/// POST /recording/pause
pub async fn pause_recording(State(state): State<AppState>) -> Response {
    match state.bridge.pause_recording() {
        Ok(()) => control_response(&state, "Recording paused"),
        Err(e) => error_response(e),
    }
}

/// POST /recording/resume
pub async fn resume_recording(State(state): State<AppState>) -> Response {
    match state.bridge.resume_recording() {
        Ok(()) => control_response(&state, "Recording resumed"),
        Err(e) => error_response(e),
    }
}

/// POST /recording/stop
/// The artifact reference arrives on /events once the recorder has flushed
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    match state.bridge.stop_recording() {
        Ok(()) => control_response(&state, "Recording stopping"),
        Err(e) => error_response(e),
    }
}

/// GET /recording/status
pub async fn recording_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        status: state.bridge.status(),
        session: state.bridge.stats(),
    })
}

/// GET /recording/supported?mime_type=...
pub async fn is_type_supported(
    State(state): State<AppState>,
    Query(query): Query<SupportedQuery>,
) -> impl IntoResponse {
    let supported = state.bridge.is_type_supported(&query.mime_type);
    Json(SupportedResponse {
        mime_type: query.mime_type,
        supported,
    })
}

/// GET /events
/// Server-sent stream of bridge events
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .bridge
        .subscribe()
        .map(|event| Event::default().event(event.kind.name()).json_data(&event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /artifacts/:artifact_id
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Response {
    match state.bridge.resolve_artifact(&artifact_id) {
        Ok(artifact) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artifact.mime_type.clone())],
            artifact.data.clone(),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /artifacts/:artifact_id
pub async fn revoke_artifact(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Response {
    match state.bridge.revoke_artifact(&artifact_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
