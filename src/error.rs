//! Error types for the capture bridge

use thiserror::Error;

use crate::media::RecorderState;

/// Result type for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Errors returned by the bridge and its platform seams
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A session-control call was made before `enable_camera` succeeded
    #[error("camera not enabled: call enable_camera first")]
    NotEnabled,

    /// The platform refused access to the capture devices
    #[error("permission to capture audio/video was denied")]
    PermissionDenied,

    /// No camera or microphone is available
    #[error("no capture device available")]
    NoDevice,

    /// The preview surface id is not registered
    #[error("preview surface not found: {0}")]
    PreviewNotFound(String),

    /// The recorder cannot produce the requested container/codec
    #[error("unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    /// The recorder rejected an operation in its current state
    #[error("cannot {operation} while recorder is {state}")]
    InvalidState {
        operation: &'static str,
        state: RecorderState,
    },

    /// The capture source is already bound to a recorder
    #[error("capture source is already bound to a recorder")]
    SourceInUse,

    /// The recorder engine task is gone
    #[error("recorder engine has shut down")]
    RecorderClosed,

    /// No artifact is registered under this reference
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
}

impl BridgeError {
    /// Stable machine-readable code for host-facing error bodies
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::NotEnabled => "NOT_ENABLED",
            BridgeError::PermissionDenied => "PERMISSION_DENIED",
            BridgeError::NoDevice => "NO_DEVICE",
            BridgeError::PreviewNotFound(_) => "PREVIEW_NOT_FOUND",
            BridgeError::UnsupportedMimeType(_) => "UNSUPPORTED_MIME_TYPE",
            BridgeError::InvalidState { .. } => "INVALID_STATE",
            BridgeError::SourceInUse => "SOURCE_IN_USE",
            BridgeError::RecorderClosed => "RECORDER_CLOSED",
            BridgeError::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
        }
    }
}
