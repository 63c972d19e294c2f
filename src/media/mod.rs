pub mod artifact;
pub mod backend;
pub mod chunk;
pub mod options;
pub mod preview;
pub mod recorder;
pub mod source;

pub use artifact::{Artifact, ArtifactRef, ArtifactStore};
pub use backend::{CapturePlatform, PermissionState, SyntheticPlatform};
pub use chunk::{ChunkBuffer, MediaChunk};
pub use options::{MimeType, RecorderOptions, DEFAULT_MIME_TYPE};
pub use preview::PreviewSurfaces;
pub use recorder::{
    MediaRecorder, RecorderEvent, RecorderState, TimesliceRecorder, DEFAULT_TIMESLICE,
};
pub use source::{CaptureSource, MediaConstraints, MediaFrame, TrackKind};
