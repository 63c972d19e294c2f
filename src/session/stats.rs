use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::RecorderState;

/// Host-facing recorder status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    /// No camera enabled
    Inactive,
    /// Camera enabled, recorder idle
    Ready,
    Recording,
    Paused,
}

impl BridgeStatus {
    pub fn from_recorder(state: RecorderState) -> Self {
        match state {
            RecorderState::Inactive => BridgeStatus::Ready,
            RecorderState::Recording => BridgeStatus::Recording,
            RecorderState::Paused => BridgeStatus::Paused,
        }
    }
}

/// Snapshot of a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,

    pub status: BridgeStatus,

    /// Surface showing the live source
    pub preview_id: String,

    /// Container produced by the recorder
    pub mime_type: String,

    pub enabled_at: DateTime<Utc>,

    /// Chunks in the buffer for the current (or last) run
    pub chunks_buffered: usize,

    pub bytes_buffered: usize,

    /// Recorded time of the current run, excluding pauses. Zero when stopped.
    pub recording_duration_ms: u64,

    /// Runs that reached their stop event
    pub runs_completed: usize,
}
